//! Wheel support windows: for each tracked interpreter, the day from which a
//! package stopped (or had not yet started) publishing a usable wheel.

use std::collections::HashSet;

use chrono::NaiveDate;
use indexmap::IndexMap;
use pyo3::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{ExceptionTables, TimelineConfig, TrackedPythons};
use crate::dataset::{classify_release, ClassifiedRelease, ReleaseCache};
use crate::models::{date_max, date_min, ReleaseInfo};
use crate::parallel::map_packages;
use crate::pep440::Version;
use crate::wheel::PythonSupportTag;

/// Tracked `major.minor` key to support cutoff, in tracked order.
pub type PackageSupport = IndexMap<String, NaiveDate>;

/// Package name to its [`PackageSupport`].
pub type WheelSupportMap = IndexMap<String, PackageSupport>;

#[derive(Debug, Default)]
struct SupportDates {
    supported: Option<NaiveDate>,
    not_supported: Vec<NaiveDate>,
}

impl SupportDates {
    fn cutoff(&self) -> Option<NaiveDate> {
        match self.supported {
            None => self.not_supported.iter().copied().min(),
            Some(supported) => Some(
                self.not_supported
                    .iter()
                    .copied()
                    .filter(|&day| day > supported)
                    .min()
                    .unwrap_or_else(date_max),
            ),
        }
    }
}

fn first_minor(
    release: &ClassifiedRelease,
    matches: impl Fn(&PythonSupportTag) -> bool,
) -> Option<u32> {
    release
        .interpreters()
        .filter(|tag| matches(*tag))
        .find_map(|tag| tag.version().and_then(|version| version.minor))
}

/// `major.minor` keys a release supports once `abi3` and `py3` tags are
/// expanded to every newer tracked interpreter.  `None` when only python 2
/// tags remain; a release left with nothing but markers supports no key.
fn supported_keys(
    release: &ClassifiedRelease,
    tracked: &TrackedPythons,
) -> Option<HashSet<String>> {
    if release.pythons.iter().all(PythonSupportTag::is_py2_only) {
        return None;
    }

    let mut keys: HashSet<String> = release
        .interpreters()
        .filter(|tag| !tag.is_py2_only())
        .filter_map(|tag| tag.version().and_then(|version| version.python_key()))
        .collect();

    let mut expand_from = |start: Option<u32>| {
        if let Some(start) = start {
            keys.extend(
                tracked
                    .iter()
                    .filter(|python| python.major == 3 && python.minor > start)
                    .map(|python| python.key.clone()),
            );
        }
    };
    if release.has_stable_abi() {
        expand_from(first_minor(release, PythonSupportTag::is_cpython3));
    }
    expand_from(first_minor(release, PythonSupportTag::is_source_py3));
    Some(keys)
}

/// Support cutoffs for every tracked interpreter of one package.
///
/// The cutoffs never decrease from one tracked interpreter to the next.
pub fn package_support(
    package: &str,
    info: &ReleaseInfo,
    tracked: &TrackedPythons,
    exceptions: &ExceptionTables,
) -> PackageSupport {
    let mut only_prerelease = true;
    for raw in info.releases.keys() {
        match Version::parse(raw) {
            Ok(version) if !version.is_prerelease() => {
                only_prerelease = false;
                break;
            }
            Ok(_) => {}
            Err(e) => warn!("\"{package}\": {e}"),
        }
    }

    let mut dates: Vec<SupportDates> = tracked.iter().map(|_| SupportDates::default()).collect();
    for (raw, files) in &info.releases {
        if let Ok(version) = Version::parse(raw) {
            if version.is_prerelease() && !only_prerelease {
                debug!("\"{package}\": ignore pre-release {raw}");
                continue;
            }
        }
        let release = classify_release(package, files, exceptions);
        if release.pythons.is_empty() {
            continue;
        }
        let Some(keys) = supported_keys(&release, tracked) else {
            continue;
        };
        for (python, entry) in tracked.iter().zip(dates.iter_mut()) {
            if keys.contains(&python.key) {
                entry.supported = Some(entry.supported.map_or(release.upload_date, |day| {
                    day.max(release.upload_date)
                }));
            } else {
                entry.not_supported.push(release.upload_date);
            }
        }
    }

    let mut previous = date_min();
    let mut support = PackageSupport::with_capacity(tracked.len());
    for (python, entry) in tracked.iter().zip(&dates) {
        let cutoff = entry.cutoff().unwrap_or_else(|| {
            if !exceptions.assumes_supported(package) {
                warn!("{package}: assume python {} supported", python.key);
            }
            date_max()
        });
        previous = previous.max(cutoff);
        support.insert(python.key.clone(), previous);
    }
    support
}

/// Cutoffs for a package without cached release data: supported forever,
/// unless it was removed from the index.
pub fn missing_package_support(
    package: &str,
    tracked: &TrackedPythons,
    exceptions: &ExceptionTables,
) -> PackageSupport {
    let cutoff = exceptions.removal_date(package).unwrap_or_else(date_max);
    tracked
        .keys()
        .map(|key| (key.to_string(), cutoff))
        .collect()
}

/// Support cutoffs for every package, keyed in input order.
pub fn build_wheel_support_map(
    packages: &[String],
    cache: &ReleaseCache,
    config: &TimelineConfig,
    workers: usize,
) -> WheelSupportMap {
    info!("building wheel support map");
    let tracked = &config.tracked_pythons;
    let exceptions = &config.exceptions;
    let supports = map_packages(packages, workers, |package| match cache.load_or_skip(package) {
        Some(info) => package_support(package, &info, tracked, exceptions),
        None => missing_package_support(package, tracked, exceptions),
    });
    packages.iter().cloned().zip(supports).collect()
}

#[pyfunction]
#[pyo3(name = "build_wheel_support_map", signature = (packages, cache_dir, workers=4))]
pub fn py_build_wheel_support_map(
    py: Python<'_>,
    packages: Vec<String>,
    cache_dir: &str,
    workers: usize,
) -> PyResult<WheelSupportMap> {
    let config = TimelineConfig::from_env()?;
    let cache = ReleaseCache::new(cache_dir);
    Ok(py.allow_threads(|| build_wheel_support_map(&packages, &cache, &config, workers)))
}
