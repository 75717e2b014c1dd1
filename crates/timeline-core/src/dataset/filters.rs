//! Minimum-python download filters (`<name>-<major.minor>`) derived from the
//! latest stable release of a package.

use std::collections::BTreeSet;

use pyo3::prelude::*;
use tracing::{debug, warn};

use crate::config::{ExceptionTables, TimelineConfig};
use crate::errors::{TimelineError, TimelineResult};
use crate::models::{ReleaseFile, ReleaseInfo};
use crate::pep440::{SpecifierSet, Version};
use crate::wheel::{PythonSupportTag, WheelFilename};

use super::classifier::classify_release;

const FALLBACK_PYTHON: &str = "2.0";

/// Highest parseable, non-prerelease version among `versions`.
pub fn latest_stable_version<'a>(
    package: &str,
    versions: impl IntoIterator<Item = &'a String>,
) -> Option<String> {
    let mut latest: Option<(&String, Version)> = None;
    for raw in versions {
        let version = match Version::parse(raw) {
            Ok(version) => version,
            Err(e) => {
                warn!("\"{package}\": {e}");
                continue;
            }
        };
        if version.is_prerelease() {
            debug!("\"{package}\": ignore pre-release {raw}");
            continue;
        }
        if latest.as_ref().map_or(true, |(_, best)| version > *best) {
            latest = Some((raw, version));
        }
    }
    latest.map(|(raw, _)| raw.clone())
}

/// Lowest python (`2.6`, `2.7`, then `3.0` to `3.98`) admitted by any of
/// the specifier sets.
fn min_python(spec_sets: &[SpecifierSet]) -> Option<String> {
    let candidates = (6..8)
        .map(|minor| format!("2.{minor}"))
        .chain((0..99).map(|minor| format!("3.{minor}")));
    for candidate in candidates {
        if spec_sets.iter().any(|spec| spec.contains_str(&candidate)) {
            return Some(candidate);
        }
    }
    None
}

fn python_from_tag(tag: &PythonSupportTag) -> Option<String> {
    let version = tag.version()?;
    Some(match (tag, version.major, version.minor) {
        (PythonSupportTag::SourceOnly(_), 2, None) => FALLBACK_PYTHON.to_string(),
        (PythonSupportTag::SourceOnly(_), 3, Some(2)) => "3.0".to_string(),
        (_, major, minor) => format!("{major}.{}", minor.unwrap_or(0)),
    })
}

/// Compute the filter string of one release.
///
/// Returns `None` when the release has no wheel or no usable interpreter tag,
/// and [`TimelineError::Filter`] when its wheels disagree on the
/// distribution name.
pub fn package_filter(
    files: &[ReleaseFile],
    last_requires_python: Option<&str>,
    exceptions: &ExceptionTables,
) -> TimelineResult<Option<String>> {
    let mut names = BTreeSet::new();
    let mut spec_sets = Vec::new();
    for file in files {
        let filename = file.filename.as_str();
        if !filename.to_lowercase().ends_with(".whl") {
            continue;
        }
        let Some(wheel) = WheelFilename::parse(filename) else {
            continue;
        };
        names.insert(wheel.name.to_lowercase());
        if let Some(raw) = file.requires_python.as_deref().filter(|raw| !raw.is_empty()) {
            match SpecifierSet::parse_requires_python(raw) {
                Ok(spec) => spec_sets.push(spec),
                Err(_) => warn!("invalid requires_python \"{raw}\" for wheel \"{filename}\""),
            }
        }
    }

    let mut names = names.into_iter();
    let Some(name) = names.next() else {
        return Ok(None);
    };
    if let Some(other) = names.next() {
        return Err(TimelineError::Filter(format!(
            "wheels for more than one distribution: '{name}', '{other}'"
        )));
    }

    let mut python = if spec_sets.is_empty() {
        let release = classify_release(&name, files, exceptions);
        let derived = release.interpreters().next().and_then(python_from_tag);
        match derived {
            Some(python) => python,
            None => return Ok(None),
        }
    } else {
        min_python(&spec_sets).unwrap_or_else(|| FALLBACK_PYTHON.to_string())
    };

    if let Some(raw) = last_requires_python.filter(|raw| !raw.trim().is_empty()) {
        match SpecifierSet::parse(raw) {
            Ok(last) if !last.contains_str(&python) => {
                if let Some(recomputed) = min_python(std::slice::from_ref(&last)) {
                    python = recomputed;
                }
            }
            Ok(_) => {}
            Err(_) => warn!("\"{name}\": invalid requires_python \"{raw}\""),
        }
    }

    let filter = format!("{name}-{python}");
    Ok(Some(exceptions.filter_override(&filter).to_string()))
}

#[pyfunction]
#[pyo3(name = "latest_stable_version")]
pub fn py_latest_stable_version(
    package: &str,
    release_info_json: &str,
) -> PyResult<Option<String>> {
    let info = ReleaseInfo::from_json(release_info_json)?;
    Ok(latest_stable_version(package, info.releases.keys()))
}

#[pyfunction]
#[pyo3(name = "package_filter", signature = (files_json, last_requires_python=None))]
pub fn py_package_filter(
    files_json: &str,
    last_requires_python: Option<&str>,
) -> PyResult<Option<String>> {
    let config = TimelineConfig::from_env()?;
    let files: Vec<ReleaseFile> =
        serde_json::from_str(files_json).map_err(TimelineError::from)?;
    Ok(package_filter(&files, last_requires_python, &config.exceptions)?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn file(name: &str, requires_python: Option<&str>) -> ReleaseFile {
        ReleaseFile::new(name, NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(), requires_python)
    }

    fn filter(files: &[ReleaseFile], last: Option<&str>) -> Option<String> {
        package_filter(files, last, &ExceptionTables::default()).unwrap()
    }

    #[test]
    fn test_latest_stable_version() {
        let versions: Vec<String> = ["1.0", "2.0rc1", "1.10", "bogus!", "1.9.post1"]
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(latest_stable_version("pkg", &versions).as_deref(), Some("1.10"));

        let prereleases = vec!["1.0a1".to_string(), "1.0.dev0".to_string()];
        assert_eq!(latest_stable_version("pkg", &prereleases), None);
    }

    #[test]
    fn test_filter_from_requires_python() {
        let files = [
            file("ut-1.zip", None),
            file("Pkg-1.0-cp38-cp38-manylinux1_x86_64.whl", Some(">=3.8")),
            file("pkg-1.0-cp39-cp39-manylinux1_x86_64.whl", Some(">=3.8")),
        ];
        assert_eq!(filter(&files, None).as_deref(), Some("pkg-3.8"));
    }

    #[test]
    fn test_filter_prefers_python2_minors() {
        let files = [file(
            "pkg-1.0-py2.py3-none-manylinux1_x86_64.whl",
            Some(">=2.7, !=3.0.*, !=3.1.*"),
        )];
        assert_eq!(filter(&files, None).as_deref(), Some("pkg-2.7"));
    }

    #[test]
    fn test_filter_from_tags() {
        let files = [file("pkg-1.0-cp36-abi3-manylinux2014_x86_64.whl", None)];
        assert_eq!(filter(&files, None).as_deref(), Some("pkg-3.6"));

        let files = [file("pkg-1.0-py3-none-manylinux2014_x86_64.whl", None)];
        assert_eq!(filter(&files, None).as_deref(), Some("pkg-3.0"));

        let files = [file("pkg-1.0-py2-none-manylinux1_x86_64.whl", None)];
        assert_eq!(filter(&files, None).as_deref(), Some("pkg-2.0"));
    }

    #[test]
    fn test_filter_rechecks_last_requires_python() {
        let files = [file("pkg-1.0-cp36-abi3-manylinux2014_x86_64.whl", None)];
        assert_eq!(filter(&files, Some(">=3.9")).as_deref(), Some("pkg-3.9"));
        assert_eq!(filter(&files, Some(">=3.6")).as_deref(), Some("pkg-3.6"));
        assert_eq!(filter(&files, Some("garbage")).as_deref(), Some("pkg-3.6"));
    }

    #[test]
    fn test_filter_override_applies() {
        let files = [file("Cython-3.0-py2.py3-none-manylinux1_x86_64.whl", Some(">=2.7"))];
        assert_eq!(filter(&files, None).as_deref(), Some("cython-3.6"));
    }

    #[test]
    fn test_filter_override_table_is_configurable() {
        let files = [file("pkg-1.0-cp36-cp36m-manylinux1_x86_64.whl", None)];
        let mut exceptions = ExceptionTables::default();
        assert_eq!(
            package_filter(&files, None, &exceptions).unwrap().as_deref(),
            Some("pkg-3.6")
        );

        exceptions
            .filter_overrides
            .insert("pkg-3.6".to_string(), "pkg-3.9".to_string());
        assert_eq!(
            package_filter(&files, None, &exceptions).unwrap().as_deref(),
            Some("pkg-3.9")
        );
    }

    #[test]
    fn test_filter_from_tags_uses_first_interpreter() {
        let files = [
            file("pkg-1.0-cp311-cp311-manylinux_2_17_x86_64.whl", None),
            file("pkg-1.0-cp39-cp39-manylinux_2_17_x86_64.whl", None),
            file("pkg-1.0-pp310-pypy310_pp73-manylinux_2_17_x86_64.whl", None),
        ];
        assert_eq!(filter(&files, None).as_deref(), Some("pkg-3.9"));
    }

    #[test]
    fn test_filter_without_wheels_or_tags() {
        assert_eq!(filter(&[file("pkg-1.0.tar.gz", None)], None), None);
        let files = [file("pkg-1.0-cp3-cp3m-manylinux1_x86_64.whl", None)];
        assert_eq!(filter(&files, None), None);
    }

    #[test]
    fn test_filter_rejects_mixed_names() {
        let files = [
            file("alpha-1.0-cp38-cp38-manylinux1_x86_64.whl", None),
            file("beta-1.0-cp38-cp38-manylinux1_x86_64.whl", None),
        ];
        let result = package_filter(&files, None, &ExceptionTables::default());
        assert!(matches!(result, Err(TimelineError::Filter(_))));
    }
}
