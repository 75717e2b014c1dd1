//! Version selection: at most one release per upload day, in version order.

use indexmap::IndexMap;
use pyo3::prelude::*;
use tracing::warn;

use crate::errors::TimelineResult;
use crate::models::{date_max, ReleaseFile, ReleaseInfo};
use crate::pep440::Version;

/// Earliest upload day over all files of a release; `date_max()` when empty.
pub fn earliest_upload(files: &[ReleaseFile]) -> chrono::NaiveDate {
    files
        .iter()
        .map(|file| file.upload_time)
        .fold(date_max(), |earliest, day| earliest.min(day))
}

/// Select the versions to keep, newest first.
///
/// A version is kept only when it was first uploaded strictly before the
/// previously kept (higher) version.  This drops same-day duplicates as well
/// as maintenance releases of older branches.
pub fn select_versions(
    package: &str,
    releases: &IndexMap<String, Vec<ReleaseFile>>,
) -> Vec<String> {
    let mut candidates: Vec<(&str, Version)> = Vec::with_capacity(releases.len());
    for raw in releases.keys() {
        match Version::parse(raw) {
            Ok(version) => candidates.push((raw.as_str(), version)),
            Err(e) => warn!("\"{package}\": {e}"),
        }
    }
    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    let mut previous = date_max();
    let mut selected = Vec::new();
    for (raw, _) in candidates {
        let upload_date = earliest_upload(&releases[raw]);
        if upload_date < previous {
            previous = upload_date;
            selected.push(raw.to_string());
        }
    }
    selected
}

pub fn select_versions_json(package: &str, release_info_json: &str) -> TimelineResult<Vec<String>> {
    let info = ReleaseInfo::from_json(release_info_json)?;
    Ok(select_versions(package, &info.releases))
}

#[pyfunction]
#[pyo3(name = "select_versions")]
pub fn py_select_versions(package: &str, release_info_json: &str) -> PyResult<Vec<String>> {
    Ok(select_versions_json(package, release_info_json)?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn releases(entries: &[(&str, Vec<NaiveDate>)]) -> IndexMap<String, Vec<ReleaseFile>> {
        entries
            .iter()
            .map(|(version, days)| {
                let files = days
                    .iter()
                    .map(|&d| ReleaseFile::new("ut-1.zip", d, None))
                    .collect();
                (version.to_string(), files)
            })
            .collect()
    }

    #[test]
    fn test_newest_first() {
        let input = releases(&[
            ("1.0", vec![day(2020, 1, 1)]),
            ("1.1", vec![day(2020, 2, 1)]),
            ("2.0", vec![day(2020, 3, 1)]),
        ]);
        assert_eq!(select_versions("pkg", &input), vec!["2.0", "1.1", "1.0"]);
    }

    #[test]
    fn test_same_day_keeps_highest_version() {
        let input = releases(&[
            ("1.0", vec![day(2020, 1, 1)]),
            ("1.0.1", vec![day(2020, 1, 1)]),
        ]);
        assert_eq!(select_versions("pkg", &input), vec!["1.0.1"]);
    }

    #[test]
    fn test_maintenance_release_is_dropped() {
        let input = releases(&[
            ("1.0", vec![day(2020, 1, 1)]),
            ("2.0", vec![day(2020, 6, 1)]),
            ("1.1", vec![day(2020, 9, 1)]),
        ]);
        assert_eq!(select_versions("pkg", &input), vec!["2.0", "1.0"]);
    }

    #[test]
    fn test_earliest_file_decides() {
        let input = releases(&[
            ("1.0", vec![day(2020, 5, 1), day(2020, 1, 1)]),
            ("1.1", vec![day(2020, 3, 1)]),
        ]);
        assert_eq!(select_versions("pkg", &input), vec!["1.1", "1.0"]);
    }

    #[test]
    fn test_invalid_and_empty_releases() {
        let input = releases(&[
            ("not-a-version!", vec![day(2020, 1, 1)]),
            ("1.0", vec![day(2020, 1, 2)]),
            ("2.0", vec![]),
        ]);
        assert_eq!(select_versions("pkg", &input), vec!["1.0"]);
    }

    #[test]
    fn test_prereleases_are_ordered_by_pep440() {
        let input = releases(&[
            ("1.0rc1", vec![day(2020, 1, 1)]),
            ("1.0", vec![day(2020, 2, 1)]),
            ("1.0.post1", vec![day(2020, 3, 1)]),
        ]);
        assert_eq!(select_versions("pkg", &input), vec!["1.0.post1", "1.0", "1.0rc1"]);
    }

    #[test]
    fn test_select_versions_json() {
        let json = r#"{"releases": {
            "0.1": [{"filename": "ut-1.zip", "upload_time": "2019-01-01", "requires_python": null}],
            "0.2": [{"filename": "ut-1.zip", "upload_time": "2019-02-01", "requires_python": null}]
        }}"#;
        assert_eq!(select_versions_json("pkg", json).unwrap(), vec!["0.2", "0.1"]);
        assert!(select_versions_json("pkg", "not json").is_err());
    }
}
