//! Shared typed models used across the dataset and consumer layers.

use std::sync::LazyLock;

use chrono::NaiveDate;
use indexmap::IndexMap;
use pyo3::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Date bounds
// ---------------------------------------------------------------------------

/// Earliest representable day, used as the "never" lower bound.
pub fn date_min() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Latest representable day, used as "assume supported going forward".
pub fn date_max() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

// ---------------------------------------------------------------------------
// Package names
// ---------------------------------------------------------------------------

static NAME_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

/// Normalize a project name the way the package index does (PEP 503).
#[pyfunction]
pub fn canonicalize_name(name: &str) -> String {
    NAME_SEPARATOR_RE.replace_all(name, "-").to_lowercase()
}

// ---------------------------------------------------------------------------
// Release info
// ---------------------------------------------------------------------------

/// One file of a release, as stored in the release cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub filename: String,
    #[serde(with = "upload_time")]
    pub upload_time: NaiveDate,
    #[serde(default)]
    pub requires_python: Option<String>,
}

impl ReleaseFile {
    pub fn new(filename: &str, upload_time: NaiveDate, requires_python: Option<&str>) -> Self {
        Self {
            filename: filename.to_string(),
            upload_time,
            requires_python: requires_python.map(str::to_string),
        }
    }
}

/// All releases of one package, keyed by the version string as published.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub releases: IndexMap<String, Vec<ReleaseFile>>,
}

impl ReleaseInfo {
    pub fn from_json(json: &str) -> crate::errors::TimelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// `upload_time` is either a plain date or a full ISO-8601 timestamp; only the
/// calendar day is kept.
mod upload_time {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let day = raw.get(..10).unwrap_or(raw.as_str());
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| de::Error::custom(format!("invalid upload_time '{raw}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// A dataset record: one retained release of one package.
#[pyclass(frozen, get_all)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Row {
    pub day: NaiveDate,
    pub package: String,
    pub version: String,
    pub python: String,
    pub manylinux: String,
}

#[pymethods]
impl Row {
    #[new]
    fn new(
        day: NaiveDate,
        package: String,
        version: String,
        python: String,
        manylinux: String,
    ) -> Self {
        Self {
            day,
            package,
            version,
            python,
            manylinux,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Row(day={}, package={:?}, version={:?}, python={:?}, manylinux={:?})",
            self.day, self.package, self.version, self.python, self.manylinux,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_name() {
        assert_eq!(canonicalize_name("Foo.Bar__baz"), "foo-bar-baz");
        assert_eq!(canonicalize_name("opencv_python"), "opencv-python");
        assert_eq!(canonicalize_name("numpy"), "numpy");
    }

    #[test]
    fn test_release_info_accepts_dates_and_timestamps() {
        let json = r#"{
            "etag": "abc",
            "releases": {
                "1.0": [
                    {"filename": "ut-1.zip", "upload_time": "2020-01-02", "requires_python": null},
                    {"filename": "a-1.0-cp38-cp38-manylinux1_x86_64.whl",
                     "upload_time": "2020-01-03T10:11:12", "requires_python": ">=3.8"}
                ],
                "0.9": [
                    {"filename": "a-0.9.tar.gz", "upload_time": "2019-05-06T00:00:00.123456Z"}
                ]
            }
        }"#;
        let info = ReleaseInfo::from_json(json).unwrap();
        assert_eq!(info.etag.as_deref(), Some("abc"));
        let versions: Vec<&str> = info.releases.keys().map(String::as_str).collect();
        assert_eq!(versions, vec!["1.0", "0.9"]);
        let files = &info.releases["1.0"];
        assert_eq!(files[1].upload_time, NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
        assert_eq!(files[1].requires_python.as_deref(), Some(">=3.8"));
        assert_eq!(info.releases["0.9"][0].requires_python, None);
    }

    #[test]
    fn test_release_file_serializes_plain_date() {
        let file = ReleaseFile::new("ut-1.zip", NaiveDate::from_ymd_opt(2021, 7, 9).unwrap(), None);
        let json = serde_json::to_string(&file).unwrap();
        assert_eq!(
            json,
            r#"{"filename":"ut-1.zip","upload_time":"2021-07-09","requires_python":null}"#
        );
    }

    #[test]
    fn test_invalid_upload_time_is_an_error() {
        let json = r#"{"releases": {"1.0": [{"filename": "x", "upload_time": "yesterday"}]}}"#;
        assert!(ReleaseInfo::from_json(json).is_err());
    }
}
