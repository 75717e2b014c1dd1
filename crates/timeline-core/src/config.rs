//! Runtime configuration: the tracked interpreter table and the static
//! exception tables that correct for inconsistent upstream metadata.
//!
//! Everything here has a built-in default.  A JSON file named by
//! `MANYLINUX_TIMELINE_CONFIG` can replace any section:
//!
//! ```json
//! {
//!   "tracked_pythons": [{"version": "3.9", "end_of_life": "2025-10-31"}],
//!   "exceptions": {"removed_packages": {"some-package": "2024-01-31"}}
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{TimelineError, TimelineResult};
use crate::models::canonicalize_name;

pub const CONFIG_ENV_VAR: &str = "MANYLINUX_TIMELINE_CONFIG";

// (major, minor, end-of-life year, month, day)
const DEFAULT_TRACKED_PYTHONS: &[(u32, u32, i32, u32, u32)] = &[
    (3, 7, 2023, 6, 27),
    (3, 8, 2024, 10, 7),
    (3, 9, 2025, 10, 31),
    (3, 10, 2026, 10, 31),
    (3, 11, 2027, 10, 31),
    (3, 12, 2028, 10, 31),
    (3, 13, 2029, 10, 31),
    (3, 14, 2030, 10, 31),
    (3, 15, 2031, 10, 31),
];

/// Packages without any wheel evidence for some tracked interpreter that are
/// known and should not warn.
const DEFAULT_ASSUMED_SUPPORTED: &[&str] = &[
    "carbonara-pyvex",
    "libaio-bins",
    "ms-ivy",
    "nighres",
    "oneqloud-polynomials",
    "sciunit2",
    "simuvex",
    "tesseract-python",
];

const DEFAULT_FILTER_OVERRIDES: &[(&str, &str)] = &[
    ("cython-2.7", "cython-3.6"),                 // no wheels below 3.6
    ("opencv_python-3.6", "opencv_python-3.7"),   // no wheels below 3.7
    ("visualdl-2.7", "visualdl-3.0"),             // pure wheel, no requires_python
    ("parallel_ssh-2.7", "parallel_ssh-3.6"),     // pure wheel, no requires_python
    ("python_snappy-3.6", "python_snappy-3.8"),   // pure wheel, no requires_python
    ("tslearn-3.6", "tslearn-3.8"),               // pure wheel, no requires_python
    ("tensorrt-3.6", "tensorrt-3.8"),             // meta-package, no requires_python
    ("cobra-2.7", "cobra-3.8"),                   // pure wheel, no requires_python
];

// ---------------------------------------------------------------------------
// Tracked interpreter versions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedPython {
    pub key: String,
    pub major: u32,
    pub minor: u32,
    pub end_of_life: NaiveDate,
}

/// On-disk form of one tracked interpreter.
#[derive(Debug, Deserialize)]
pub struct TrackedPythonEntry {
    version: String,
    end_of_life: NaiveDate,
}

/// Tracked `major.minor` interpreter versions, strictly ascending.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<TrackedPythonEntry>")]
pub struct TrackedPythons(Vec<TrackedPython>);

fn parse_key(key: &str) -> TimelineResult<(u32, u32)> {
    let invalid = || TimelineError::Config(format!("tracked python '{key}' is not major.minor"));
    let (major, minor) = key.split_once('.').ok_or_else(invalid)?;
    let major = major.parse::<u32>().map_err(|_| invalid())?;
    let minor = minor.parse::<u32>().map_err(|_| invalid())?;
    Ok((major, minor))
}

impl TrackedPythons {
    pub fn new(entries: Vec<(String, NaiveDate)>) -> TimelineResult<Self> {
        let mut tracked: Vec<TrackedPython> = Vec::with_capacity(entries.len());
        for (key, end_of_life) in entries {
            let (major, minor) = parse_key(&key)?;
            if let Some(previous) = tracked.last() {
                if (previous.major, previous.minor) >= (major, minor) {
                    return Err(TimelineError::Config(format!(
                        "tracked pythons must be strictly ascending: '{}' follows '{}'",
                        key, previous.key
                    )));
                }
            }
            tracked.push(TrackedPython {
                key: format!("{major}.{minor}"),
                major,
                minor,
                end_of_life,
            });
        }
        Ok(Self(tracked))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackedPython> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TrackedPython> {
        self.0.iter().find(|tracked| tracked.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|tracked| tracked.key.as_str())
    }
}

impl Default for TrackedPythons {
    fn default() -> Self {
        Self(
            DEFAULT_TRACKED_PYTHONS
                .iter()
                .filter_map(|&(major, minor, year, month, day)| {
                    Some(TrackedPython {
                        key: format!("{major}.{minor}"),
                        major,
                        minor,
                        end_of_life: NaiveDate::from_ymd_opt(year, month, day)?,
                    })
                })
                .collect(),
        )
    }
}

impl TryFrom<Vec<TrackedPythonEntry>> for TrackedPythons {
    type Error = TimelineError;

    fn try_from(entries: Vec<TrackedPythonEntry>) -> Result<Self, Self::Error> {
        Self::new(
            entries
                .into_iter()
                .map(|entry| (entry.version, entry.end_of_life))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a TrackedPythons {
    type Item = &'a TrackedPython;
    type IntoIter = std::slice::Iter<'a, TrackedPython>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Exception tables
// ---------------------------------------------------------------------------

/// Hand-maintained corrections, keyed by canonical package name.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExceptionTables {
    /// Packages whose malformed interpreter tags are dropped without warning.
    pub malformed_tag_packages: HashSet<String>,
    /// Packages for which "no evidence, assume supported" is expected.
    pub assumed_supported_packages: HashSet<String>,
    /// Packages deleted from the index, with the day they disappeared.
    pub removed_packages: HashMap<String, NaiveDate>,
    /// Filter string replacements (`name-python` to `name-python`).
    pub filter_overrides: HashMap<String, String>,
}

impl Default for ExceptionTables {
    fn default() -> Self {
        Self {
            malformed_tag_packages: HashSet::new(),
            assumed_supported_packages: DEFAULT_ASSUMED_SUPPORTED
                .iter()
                .map(|name| name.to_string())
                .collect(),
            removed_packages: HashMap::new(),
            filter_overrides: DEFAULT_FILTER_OVERRIDES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl ExceptionTables {
    fn normalized(self) -> Self {
        Self {
            malformed_tag_packages: self
                .malformed_tag_packages
                .iter()
                .map(|name| canonicalize_name(name))
                .collect(),
            assumed_supported_packages: self
                .assumed_supported_packages
                .iter()
                .map(|name| canonicalize_name(name))
                .collect(),
            removed_packages: self
                .removed_packages
                .into_iter()
                .map(|(name, day)| (canonicalize_name(&name), day))
                .collect(),
            filter_overrides: self.filter_overrides,
        }
    }

    pub fn tolerates_malformed_tags(&self, package: &str) -> bool {
        self.malformed_tag_packages
            .contains(&canonicalize_name(package))
    }

    pub fn assumes_supported(&self, package: &str) -> bool {
        self.assumed_supported_packages
            .contains(&canonicalize_name(package))
    }

    pub fn removal_date(&self, package: &str) -> Option<NaiveDate> {
        self.removed_packages
            .get(&canonicalize_name(package))
            .copied()
    }

    pub fn filter_override<'a>(&'a self, filter: &'a str) -> &'a str {
        self.filter_overrides
            .get(filter)
            .map(String::as_str)
            .unwrap_or(filter)
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub tracked_pythons: TrackedPythons,
    pub exceptions: ExceptionTables,
}

impl TimelineConfig {
    pub fn from_json(json: &str) -> TimelineResult<Self> {
        let mut config: TimelineConfig = serde_json::from_str(json)
            .map_err(|e| TimelineError::Config(format!("invalid configuration: {e}")))?;
        config.exceptions = config.exceptions.normalized();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> TimelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load the file named by [`CONFIG_ENV_VAR`], or the defaults when unset.
    pub fn from_env() -> TimelineResult<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => {
                debug!("loading configuration from {path}");
                Self::from_file(Path::new(path.trim()))
            }
            _ => Ok(Self::default()),
        }
    }
}
