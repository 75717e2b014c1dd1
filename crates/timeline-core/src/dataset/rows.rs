//! Dataset assembly: one [`Row`] per selected release with manylinux wheels.

use std::collections::BTreeSet;

use pyo3::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{ExceptionTables, TimelineConfig};
use crate::errors::TimelineResult;
use crate::models::{ReleaseInfo, Row};
use crate::parallel::map_packages;

use super::cache::ReleaseCache;
use super::classifier::classify_release;
use super::selector::select_versions;

/// Rows of one package, newest release first.
pub fn package_rows(package: &str, info: &ReleaseInfo, exceptions: &ExceptionTables) -> Vec<Row> {
    let versions = select_versions(package, &info.releases);
    debug!("\"{package}\": using {versions:?}");

    let mut rows = Vec::new();
    for version in &versions {
        let release = classify_release(package, &info.releases[version.as_str()], exceptions);
        let python = release.python_str();
        let manylinux = release.manylinux_str();
        if python.is_empty() || manylinux.is_empty() {
            continue;
        }
        rows.push(Row {
            day: release.upload_date,
            package: package.to_string(),
            version: version.clone(),
            python,
            manylinux,
        });
    }
    if !versions.is_empty() && rows.is_empty() {
        warn!("\"{package}\": no manylinux wheel in {versions:?}");
    }
    rows
}

/// Build rows for every cached package.  Returns the sorted names of the
/// packages that produced rows together with the rows, in input order.
pub fn update_dataset(
    packages: &[String],
    cache: &ReleaseCache,
    config: &TimelineConfig,
    workers: usize,
) -> (Vec<String>, Vec<Row>) {
    let per_package = map_packages(packages, workers, |package| {
        info!("\"{package}\": begin dataset creation");
        let rows = match cache.load_or_skip(package) {
            Some(info) => package_rows(package, &info, &config.exceptions),
            None => vec![],
        };
        debug!("\"{package}\": end dataset creation");
        rows
    });

    let rows: Vec<Row> = per_package.into_iter().flatten().collect();
    let names: BTreeSet<&str> = rows.iter().map(|row| row.package.as_str()).collect();
    let names = names.into_iter().map(str::to_string).collect();
    (names, rows)
}

pub fn package_rows_json(
    package: &str,
    release_info_json: &str,
    exceptions: &ExceptionTables,
) -> TimelineResult<Vec<Row>> {
    let info = ReleaseInfo::from_json(release_info_json)?;
    Ok(package_rows(package, &info, exceptions))
}

#[pyfunction]
#[pyo3(name = "package_rows")]
pub fn py_package_rows(package: &str, release_info_json: &str) -> PyResult<Vec<Row>> {
    let config = TimelineConfig::from_env()?;
    Ok(package_rows_json(package, release_info_json, &config.exceptions)?)
}

#[pyfunction]
#[pyo3(name = "update_dataset", signature = (packages, cache_dir, workers=4))]
pub fn py_update_dataset(
    py: Python<'_>,
    packages: Vec<String>,
    cache_dir: &str,
    workers: usize,
) -> PyResult<(Vec<String>, Vec<Row>)> {
    let config = TimelineConfig::from_env()?;
    let cache = ReleaseCache::new(cache_dir);
    Ok(py.allow_threads(|| update_dataset(&packages, &cache, &config, workers)))
}
