//! Reduce a package index document to the manylinux wheels the dataset
//! needs.

use indexmap::IndexMap;
use pyo3::prelude::*;
use tracing::warn;

use crate::errors::TimelineResult;
use crate::models::{ReleaseFile, ReleaseInfo};
use crate::wheel::WheelFilename;

use super::selector::earliest_upload;

/// Name of the placeholder file that records a release's earliest upload day
/// once its non-manylinux files are gone.
pub const UPLOAD_MARKER_FILENAME: &str = "ut-1.zip";

fn keep_file(package: &str, file: &ReleaseFile) -> bool {
    let filename = file.filename.as_str();
    if !filename.to_lowercase().ends_with(".whl") {
        return false;
    }
    match WheelFilename::parse(filename) {
        Some(wheel) => wheel.is_manylinux(),
        None => {
            warn!("\"{package}\": invalid wheel name \"{filename}\"");
            false
        }
    }
}

/// Keep only manylinux wheels, prefixed by the upload-day marker.  Releases
/// without any manylinux wheel are dropped.
pub fn trim_releases(
    package: &str,
    releases: IndexMap<String, Vec<ReleaseFile>>,
) -> IndexMap<String, Vec<ReleaseFile>> {
    releases
        .into_iter()
        .filter_map(|(version, files)| {
            let earliest = earliest_upload(&files);
            let mut kept: Vec<ReleaseFile> = files
                .into_iter()
                .filter(|file| keep_file(package, file))
                .collect();
            if kept.is_empty() {
                return None;
            }
            kept.insert(0, ReleaseFile::new(UPLOAD_MARKER_FILENAME, earliest, None));
            Some((version, kept))
        })
        .collect()
}

/// Trim an index JSON document (`{"etag"?, "releases": {...}}`).  Returns the
/// trimmed document, or `None` when no release has a manylinux wheel.
pub fn trim_release_info_json(package: &str, pypi_json: &str) -> TimelineResult<Option<String>> {
    let info = ReleaseInfo::from_json(pypi_json)?;
    let trimmed = ReleaseInfo {
        etag: info.etag,
        releases: trim_releases(package, info.releases),
    };
    if trimmed.releases.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(&trimmed)?))
}

#[pyfunction]
#[pyo3(name = "trim_release_info")]
pub fn py_trim_release_info(package: &str, pypi_json: &str) -> PyResult<Option<String>> {
    Ok(trim_release_info_json(package, pypi_json)?)
}
