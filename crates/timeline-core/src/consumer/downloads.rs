//! Download-side normalization: interpreter and glibc labels, flagged with
//! `-nsw` when no supported wheel existed on the download day.

use chrono::NaiveDate;
use pyo3::prelude::*;
use tracing::warn;

use crate::config::{TimelineConfig, TrackedPythons};
use crate::models::canonicalize_name;
use crate::pep440::Version;

use super::support::WheelSupportMap;

pub const UNKNOWN_VERSION: &str = "0.0";
pub const NO_SUPPORTED_WHEEL_SUFFIX: &str = "-nsw";

/// Majors above this are garbage reported by broken installers.
const MAX_MAJOR: u64 = 50;

/// glibc versions grouped to thin out rarely used releases; each version maps
/// to the first member of its group.
const GLIBC_GROUPS: &[&[&str]] = &[
    &["2.5", "2.6", "2.7", "2.8", "2.9", "2.10", "2.11"],
    &["2.12", "2.13", "2.14", "2.15", "2.16"],
    &["2.17", "2.18", "2.19", "2.20", "2.21", "2.22", "2.23", "2.24", "2.25"],
    &["2.26"],
    &["2.27"],
    &["2.28", "2.29", "2.30"],
    &["2.31", "2.32", "2.33"],
    &["2.34"],
    &["2.35"],
    &["2.36", "2.37", "2.38"],
    &["2.39", "2.40"],
    &["2.41", "2.42"],
];

/// glibc from which download labels are never flagged.
const GLIBC_NSW_MAX: (u64, u64) = (2, 31);

/// `"major.minor"` of a version string; `"0.0"` when it does not parse or is
/// implausible.
#[pyfunction]
pub fn major_minor(raw: &str) -> String {
    match Version::parse(raw) {
        Ok(version) if version.major() <= MAX_MAJOR => {
            format!("{}.{}", version.major(), version.minor())
        }
        _ => UNKNOWN_VERSION.to_string(),
    }
}

#[pyfunction]
pub fn glibc_group(raw: &str) -> String {
    let key = major_minor(raw);
    GLIBC_GROUPS
        .iter()
        .find(|group| group.contains(&key.as_str()))
        .map(|group| group[0].to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

fn is_glibc_exempt(glibc: &str) -> bool {
    Version::parse(glibc)
        .is_ok_and(|version| (version.major(), version.minor()) >= GLIBC_NSW_MAX)
}

/// Label one download row.
///
/// Returns `None` when the interpreter is not tracked, otherwise the
/// `(python, glibc)` labels, each suffixed with `-nsw` when `day` is on or
/// after the project's cutoff for that interpreter.
pub fn label_download(
    support_map: &WheelSupportMap,
    tracked: &TrackedPythons,
    project: &str,
    python_version: &str,
    glibc_version: &str,
    day: NaiveDate,
) -> Option<(String, String)> {
    let python = major_minor(python_version);
    if !tracked.contains(&python) {
        return None;
    }
    let glibc = glibc_group(glibc_version);

    let project = canonicalize_name(project);
    let unsupported = match support_map.get(&project) {
        Some(support) => support.get(&python).is_some_and(|&cutoff| day >= cutoff),
        None => {
            warn!("'{project}' not found in wheel_support_map");
            false
        }
    };
    if !unsupported {
        return Some((python, glibc));
    }

    let glibc = if is_glibc_exempt(&glibc) {
        glibc
    } else {
        format!("{glibc}{NO_SUPPORTED_WHEEL_SUFFIX}")
    };
    Some((format!("{python}{NO_SUPPORTED_WHEEL_SUFFIX}"), glibc))
}

/// `true` once `day` is on or after the end of life of the tracked
/// interpreter `python`.
pub fn past_end_of_life(tracked: &TrackedPythons, python: &str, day: NaiveDate) -> bool {
    tracked
        .get(python)
        .is_some_and(|tracked| day >= tracked.end_of_life)
}

/// Labels download rows against a support map converted once.
#[pyclass(frozen)]
pub struct DownloadLabeler {
    support_map: WheelSupportMap,
    tracked: TrackedPythons,
}

impl DownloadLabeler {
    pub fn with_tracked(support_map: WheelSupportMap, tracked: TrackedPythons) -> Self {
        Self {
            support_map,
            tracked,
        }
    }

    pub fn label_row(
        &self,
        project: &str,
        python_version: &str,
        glibc_version: &str,
        day: NaiveDate,
    ) -> Option<(String, String)> {
        label_download(
            &self.support_map,
            &self.tracked,
            project,
            python_version,
            glibc_version,
            day,
        )
    }
}

#[pymethods]
impl DownloadLabeler {
    #[new]
    fn new(support_map: WheelSupportMap) -> PyResult<Self> {
        let config = TimelineConfig::from_env()?;
        Ok(Self::with_tracked(support_map, config.tracked_pythons))
    }

    fn label(
        &self,
        project: &str,
        python_version: &str,
        glibc_version: &str,
        day: NaiveDate,
    ) -> Option<(String, String)> {
        self.label_row(project, python_version, glibc_version, day)
    }

    /// Label `(project, python_version, glibc_version, day)` rows.
    fn label_many(
        &self,
        py: Python<'_>,
        rows: Vec<(String, String, String, NaiveDate)>,
    ) -> Vec<Option<(String, String)>> {
        py.allow_threads(|| {
            rows.iter()
                .map(|(project, python, glibc, day)| self.label_row(project, python, glibc, *day))
                .collect()
        })
    }

    #[pyo3(name = "past_end_of_life")]
    fn py_past_end_of_life(&self, python_version: &str, day: NaiveDate) -> bool {
        past_end_of_life(&self.tracked, &major_minor(python_version), day)
    }

    fn __repr__(&self) -> String {
        format!(
            "DownloadLabeler(projects={}, tracked={})",
            self.support_map.len(),
            self.tracked.len()
        )
    }
}
