//! Per-release classification: earliest upload day, supported interpreters
//! and manylinux platforms of one release.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use pyo3::prelude::*;
use tracing::warn;

use crate::config::{ExceptionTables, TimelineConfig};
use crate::errors::TimelineResult;
use crate::models::{date_max, ReleaseFile};
use crate::pep440::SpecifierSet;
use crate::wheel::tags::{is_free_threaded_abi, join_tags};
use crate::wheel::{PythonSupportTag, TagVersion, WheelFilename};

/// Python 3 minors probed, in order, when resolving a bare `py3` tag.
const PY3_MINOR_SCAN: std::ops::Range<u32> = 2..99;

#[pyclass(frozen)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedRelease {
    /// Earliest upload day over every file of the release, wheels or not.
    #[pyo3(get)]
    pub upload_date: NaiveDate,
    pub pythons: BTreeSet<PythonSupportTag>,
    /// Raw (possibly compound) manylinux platform tags.
    pub platforms: BTreeSet<String>,
}

impl ClassifiedRelease {
    /// Stored form of the interpreter tags, e.g. `abi3.cp36`.
    pub fn python_str(&self) -> String {
        join_tags(&self.pythons)
    }

    /// Stored form of the platform tags with `manylinux` compacted to `ml`.
    pub fn manylinux_str(&self) -> String {
        self.platforms
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".")
            .replace("anylinux", "l")
    }

    /// Interpreter tags without the `abi3` / `free-threaded` markers.
    pub fn interpreters(&self) -> impl Iterator<Item = &PythonSupportTag> {
        self.pythons.iter().filter(|tag| !tag.is_marker())
    }

    pub fn has_stable_abi(&self) -> bool {
        self.pythons.contains(&PythonSupportTag::StableAbi)
    }
}

#[pymethods]
impl ClassifiedRelease {
    #[getter]
    fn python(&self) -> String {
        self.python_str()
    }

    #[getter]
    fn manylinux(&self) -> String {
        self.manylinux_str()
    }

    #[getter]
    fn python_tags(&self) -> Vec<String> {
        self.pythons.iter().map(|tag| tag.to_string()).collect()
    }

    #[getter]
    fn platform_tags(&self) -> Vec<String> {
        self.platforms.iter().cloned().collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "ClassifiedRelease(upload_date={}, python={:?}, manylinux={:?})",
            self.upload_date,
            self.python_str(),
            self.manylinux_str(),
        )
    }
}

fn parse_requires_python(file: &ReleaseFile) -> Option<SpecifierSet> {
    let raw = file.requires_python.as_deref().filter(|raw| !raw.is_empty())?;
    match SpecifierSet::parse_requires_python(raw) {
        Ok(spec) => Some(spec),
        Err(_) => {
            warn!(
                "invalid requires_python \"{raw}\" for wheel \"{}\"",
                file.filename
            );
            None
        }
    }
}

/// Resolve a bare `py3` to the lowest `py3{minor}` allowed by
/// `requires_python`; without a usable specifier this is `py32`.
fn resolve_bare_py3(requires_python: Option<&SpecifierSet>) -> Option<PythonSupportTag> {
    let minor = match requires_python {
        None => 2,
        Some(spec) => PY3_MINOR_SCAN
            .clone()
            .find(|minor| spec.contains_str(&format!("3.{minor}")))?,
    };
    Some(PythonSupportTag::SourceOnly(TagVersion::new(3, Some(minor))))
}

/// Classify all files of one release.
///
/// Unusable files and tags are logged and skipped; a release without any
/// manylinux wheel comes back with empty tag sets.
pub fn classify_release(
    package: &str,
    files: &[ReleaseFile],
    exceptions: &ExceptionTables,
) -> ClassifiedRelease {
    let tolerate_malformed = exceptions.tolerates_malformed_tags(package);
    let mut upload_date = date_max();
    let mut pythons = BTreeSet::new();
    let mut platforms = BTreeSet::new();

    for file in files {
        upload_date = upload_date.min(file.upload_time);
        let filename = file.filename.as_str();
        if !filename.to_lowercase().ends_with(".whl") {
            continue;
        }
        let Some(wheel) = WheelFilename::parse(filename) else {
            warn!("\"{package}\": invalid wheel name \"{filename}\"");
            continue;
        };
        if !wheel.is_manylinux() {
            continue;
        }
        let requires_python = parse_requires_python(file);

        for raw_tag in wheel.python_tags() {
            let Some(mut tag) = PythonSupportTag::parse(raw_tag) else {
                warn!("ignoring python \"{raw_tag}\" for wheel \"{filename}\"");
                continue;
            };
            if tag.is_bare_py3() {
                if wheel.abi_tag != "none" {
                    warn!(
                        "ignoring python \"{raw_tag}-{}\" for wheel \"{filename}\"",
                        wheel.abi_tag
                    );
                    continue;
                }
                match resolve_bare_py3(requires_python.as_ref()) {
                    Some(resolved) => tag = resolved,
                    None => {
                        warn!(
                            "unresolved requires_python \"{}\" for wheel \"{filename}\"",
                            file.requires_python.as_deref().unwrap_or_default()
                        );
                        continue;
                    }
                }
            }
            if tag.lacks_minor() {
                if !tolerate_malformed {
                    warn!("ignoring python \"{raw_tag}\" for wheel \"{filename}\"");
                }
                continue;
            }

            let is_cpython3 = tag.is_cpython3();
            let is_source_py3 = tag.is_source_py3();
            pythons.insert(tag);
            if wheel.abi_tag == "abi3" {
                if !is_cpython3 {
                    if !tolerate_malformed {
                        warn!("ignoring python \"{raw_tag}-abi3\" for wheel \"{filename}\"");
                    }
                    continue;
                }
                pythons.insert(PythonSupportTag::StableAbi);
            }
            if is_free_threaded_abi(&wheel.abi_tag) || is_source_py3 {
                pythons.insert(PythonSupportTag::FreeThreaded);
            }
        }
        platforms.insert(wheel.platform_tag.clone());
    }

    ClassifiedRelease {
        upload_date,
        pythons,
        platforms,
    }
}

/// Classify a JSON list of release files (`[{"filename", "upload_time",
/// "requires_python"}, ...]`).
pub fn classify_release_json(
    package: &str,
    files_json: &str,
    exceptions: &ExceptionTables,
) -> TimelineResult<ClassifiedRelease> {
    let files: Vec<ReleaseFile> = serde_json::from_str(files_json)?;
    Ok(classify_release(package, &files, exceptions))
}

#[pyfunction]
#[pyo3(name = "classify_release")]
pub fn py_classify_release(package: &str, files_json: &str) -> PyResult<ClassifiedRelease> {
    let config = TimelineConfig::from_env()?;
    Ok(classify_release_json(package, files_json, &config.exceptions)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::capture_warnings;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn file(name: &str, uploaded: NaiveDate, requires_python: Option<&str>) -> ReleaseFile {
        ReleaseFile::new(name, uploaded, requires_python)
    }

    fn classify(files: &[ReleaseFile]) -> ClassifiedRelease {
        classify_release("pkg", files, &ExceptionTables::default())
    }

    #[test]
    fn test_compiled_wheels() {
        let release = classify(&[
            file("ut-1.zip", day(2021, 3, 1), None),
            file(
                "pkg-1.0-cp39-cp39-manylinux_2_17_x86_64.manylinux2014_x86_64.whl",
                day(2021, 3, 2),
                None,
            ),
            file("pkg-1.0-cp310-cp310-manylinux1_x86_64.whl", day(2021, 3, 4), None),
            file("pkg-1.0-cp38-cp38-win_amd64.whl", day(2021, 3, 4), None),
        ]);
        assert_eq!(release.upload_date, day(2021, 3, 1));
        assert_eq!(release.python_str(), "cp39.cp310");
        assert_eq!(
            release.manylinux_str(),
            "ml1_x86_64.ml_2_17_x86_64.ml2014_x86_64"
        );
    }

    #[test]
    fn test_sdist_only_release_keeps_its_date() {
        let release = classify(&[
            file("pkg-1.0.tar.gz", day(2020, 5, 6), None),
            file("pkg-1.0.zip", day(2020, 5, 4), None),
        ]);
        assert_eq!(release.upload_date, day(2020, 5, 4));
        assert!(release.pythons.is_empty());
        assert_eq!(release.manylinux_str(), "");
    }

    #[test]
    fn test_stable_abi_marker() {
        let release = classify(&[file(
            "pkg-1.0-cp36-abi3-manylinux2014_x86_64.whl",
            day(2022, 1, 1),
            None,
        )]);
        assert_eq!(release.python_str(), "abi3.cp36");
        assert!(release.has_stable_abi());
    }

    #[test]
    fn test_abi3_on_non_cpython_keeps_tag_only() {
        let release = classify(&[file(
            "pkg-1.0-pp39-abi3-manylinux2014_x86_64.whl",
            day(2022, 1, 1),
            None,
        )]);
        assert_eq!(release.python_str(), "pp39");
    }

    #[test]
    fn test_malformed_tag_packages_do_not_warn() {
        let files = [file(
            "pkg-1.0-pp39-abi3-manylinux2014_x86_64.whl",
            day(2022, 1, 1),
            None,
        )];

        let (release, warnings) = capture_warnings(|| classify(&files));
        assert_eq!(release.python_str(), "pp39");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("pp39-abi3"), "{warnings:?}");

        let mut exceptions = ExceptionTables::default();
        exceptions.malformed_tag_packages.insert("pkg".to_string());
        let (release, warnings) =
            capture_warnings(|| classify_release("Pkg", &files, &exceptions));
        assert_eq!(release.python_str(), "pp39");
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_bare_py3_resolution() {
        let release = classify(&[file(
            "pkg-1.0-py3-none-manylinux1_x86_64.whl",
            day(2022, 1, 1),
            Some(">=3.8"),
        )]);
        assert_eq!(release.python_str(), "free-threaded.py38");

        let release = classify(&[file(
            "pkg-1.0-py3-none-manylinux1_x86_64.whl",
            day(2022, 1, 1),
            None,
        )]);
        assert_eq!(release.python_str(), "free-threaded.py32");

        let release = classify(&[file(
            "pkg-1.0-py3-none-manylinux1_x86_64.whl",
            day(2022, 1, 1),
            Some(">=3,<3.9"),
        )]);
        assert_eq!(release.python_str(), "free-threaded.py32");
    }

    #[test]
    fn test_bare_py3_fixups_and_unparseable_specifier() {
        let release = classify(&[file(
            "pkg-1.0-py3-none-manylinux1_x86_64.whl",
            day(2022, 1, 1),
            Some(">=3.6.*"),
        )]);
        assert_eq!(release.python_str(), "free-threaded.py36");

        let release = classify(&[file(
            "pkg-1.0-py3-none-manylinux1_x86_64.whl",
            day(2022, 1, 1),
            Some("not a specifier"),
        )]);
        assert_eq!(release.python_str(), "free-threaded.py32");
    }

    #[test]
    fn test_bare_py3_dropped_when_unresolvable_or_compiled() {
        let release = classify(&[file(
            "pkg-1.0-py3-none-manylinux1_x86_64.whl",
            day(2022, 1, 1),
            Some("<3"),
        )]);
        assert!(release.pythons.is_empty());
        // The platform still counts even though no interpreter survived.
        assert_eq!(release.manylinux_str(), "ml1_x86_64");

        let release = classify(&[file(
            "pkg-1.0-py3-cp39-manylinux1_x86_64.whl",
            day(2022, 1, 1),
            None,
        )]);
        assert!(release.pythons.is_empty());
    }

    #[test]
    fn test_implementation_prefixes_and_compound_tags() {
        let release = classify(&[
            file(
                "pkg-1.0-graalpy311-graalpy311_native-manylinux2014_x86_64.whl",
                day(2023, 1, 1),
                None,
            ),
            file(
                "pkg-1.0-pp39.pp310-pypy_73-manylinux2014_x86_64.whl",
                day(2023, 1, 1),
                None,
            ),
            file("pkg-1.0-py2.py3-none-manylinux1_x86_64.whl", day(2023, 1, 1), None),
        ]);
        assert_eq!(release.python_str(), "py2.free-threaded.py32.pp39.pp310.gp311");
    }

    #[test]
    fn test_missing_minor_is_dropped() {
        let release = classify(&[file(
            "pkg-1.0-cp3-cp3m-manylinux1_x86_64.whl",
            day(2023, 1, 1),
            None,
        )]);
        assert!(release.pythons.is_empty());

        let mut exceptions = ExceptionTables::default();
        exceptions.malformed_tag_packages.insert("pkg".to_string());
        let release = classify_release(
            "pkg",
            &[file("pkg-1.0-cp3-cp3m-manylinux1_x86_64.whl", day(2023, 1, 1), None)],
            &exceptions,
        );
        assert!(release.pythons.is_empty());
    }

    #[test]
    fn test_free_threaded_abi() {
        let release = classify(&[
            file("pkg-1.0-cp313-cp313t-manylinux_2_28_x86_64.whl", day(2024, 10, 1), None),
            file("pkg-1.0-cp313-cp313-manylinux_2_28_x86_64.whl", day(2024, 10, 1), None),
        ]);
        assert_eq!(release.python_str(), "free-threaded.cp313");
    }

    #[test]
    fn test_invalid_tags_are_skipped_individually() {
        let release = classify(&[file(
            "pkg-1.0-cpython.cp38-cp38-manylinux1_x86_64.whl",
            day(2020, 1, 1),
            None,
        )]);
        assert_eq!(release.python_str(), "cp38");
    }

    #[test]
    fn test_classify_release_json() {
        let json = r#"[
            {"filename": "ut-1.zip", "upload_time": "2020-01-01", "requires_python": null},
            {"filename": "pkg-1.0-cp38-cp38-manylinux1_x86_64.whl",
             "upload_time": "2020-01-02T08:00:00", "requires_python": ">=3.8"}
        ]"#;
        let release = classify_release_json("pkg", json, &ExceptionTables::default()).unwrap();
        assert_eq!(release.upload_date, day(2020, 1, 1));
        assert_eq!(release.python_str(), "cp38");
        assert!(classify_release_json("pkg", "{", &ExceptionTables::default()).is_err());
    }
}
