//! PEP 440 version specifiers and `requires_python` normalization.

use std::fmt;

use crate::errors::{TimelineError, TimelineResult};
use crate::pep440::version::Version;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Compatible,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Arbitrary,
}

// Longest spellings first so that `===` is not read as `==`.
const OPERATORS: &[(&str, Operator)] = &[
    ("===", Operator::Arbitrary),
    ("~=", Operator::Compatible),
    ("==", Operator::Equal),
    ("!=", Operator::NotEqual),
    ("<=", Operator::LessEqual),
    (">=", Operator::GreaterEqual),
    ("<", Operator::Less),
    (">", Operator::Greater),
];

/// A single `<op><version>` clause.
#[derive(Clone, Debug)]
pub struct Specifier {
    operator: Operator,
    raw_version: String,
    version: Option<Version>,
    wildcard: bool,
}

fn invalid(raw: &str) -> TimelineError {
    TimelineError::Specifier(format!("'{raw}'"))
}

impl Specifier {
    pub fn parse(input: &str) -> TimelineResult<Self> {
        let trimmed = input.trim();
        let (spelling, operator) = OPERATORS
            .iter()
            .find(|(spelling, _)| trimmed.starts_with(*spelling))
            .copied()
            .ok_or_else(|| invalid(input))?;
        let raw_version = trimmed[spelling.len()..].trim();
        if raw_version.is_empty() || raw_version.chars().any(char::is_whitespace) {
            return Err(invalid(input));
        }

        if operator == Operator::Arbitrary {
            return Ok(Self {
                operator,
                raw_version: raw_version.to_string(),
                version: None,
                wildcard: false,
            });
        }

        let (text, wildcard) = match raw_version.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (raw_version, false),
        };
        if wildcard && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(invalid(input));
        }
        let version = Version::parse(text).map_err(|_| invalid(input))?;
        if version.is_local() && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(invalid(input));
        }
        if wildcard && version.is_local() {
            return Err(invalid(input));
        }
        if operator == Operator::Compatible && version.release().len() < 2 {
            return Err(invalid(input));
        }

        Ok(Self {
            operator,
            raw_version: raw_version.to_string(),
            version: Some(version),
            wildcard,
        })
    }

    fn names_prerelease(&self) -> bool {
        self.version.as_ref().is_some_and(Version::is_prerelease)
    }

    pub fn contains(&self, candidate: &Version) -> bool {
        let Some(spec) = &self.version else {
            return candidate
                .to_string()
                .eq_ignore_ascii_case(&self.raw_version);
        };
        match self.operator {
            Operator::Equal => self.matches_equal(spec, candidate),
            Operator::NotEqual => !self.matches_equal(spec, candidate),
            Operator::LessEqual => candidate.public() <= *spec,
            Operator::GreaterEqual => candidate.public() >= *spec,
            Operator::Less => {
                if candidate >= spec {
                    return false;
                }
                !(!spec.is_prerelease()
                    && candidate.is_prerelease()
                    && candidate.base_version() == spec.base_version())
            }
            Operator::Greater => {
                if candidate <= spec {
                    return false;
                }
                let same_base = candidate.base_version() == spec.base_version();
                if !spec.is_postrelease() && candidate.is_postrelease() && same_base {
                    return false;
                }
                !(candidate.is_local() && same_base)
            }
            Operator::Compatible => {
                let release = spec.release();
                let prefix = &release[..release.len() - 1];
                candidate.public() >= *spec
                    && release_prefix_matches(spec.epoch(), prefix, candidate)
            }
            Operator::Arbitrary => false,
        }
    }

    fn matches_equal(&self, spec: &Version, candidate: &Version) -> bool {
        if self.wildcard {
            return release_prefix_matches(spec.epoch(), spec.release(), candidate);
        }
        if spec.is_local() {
            candidate == spec
        } else {
            candidate.public() == *spec
        }
    }
}

fn release_prefix_matches(epoch: u64, prefix: &[u64], candidate: &Version) -> bool {
    if candidate.epoch() != epoch {
        return false;
    }
    let release = candidate.release();
    prefix
        .iter()
        .enumerate()
        .all(|(i, part)| release.get(i).copied().unwrap_or(0) == *part)
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spelling = OPERATORS
            .iter()
            .find(|(_, op)| *op == self.operator)
            .map(|(s, _)| *s)
            .unwrap_or("");
        write!(f, "{spelling}{}", self.raw_version)
    }
}

/// A comma-separated conjunction of [`Specifier`]s.
#[derive(Clone, Debug, Default)]
pub struct SpecifierSet {
    specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    pub fn parse(input: &str) -> TimelineResult<Self> {
        let specifiers = input
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(Specifier::parse)
            .collect::<TimelineResult<Vec<_>>>()?;
        Ok(Self { specifiers })
    }

    /// Parse a `requires_python` value after repairing the malformations
    /// commonly found in upstream metadata.
    pub fn parse_requires_python(raw: &str) -> TimelineResult<Self> {
        Self::parse(&fixup_requires_python(raw))
    }

    pub fn contains(&self, candidate: &Version) -> bool {
        let allow_prereleases = self.specifiers.iter().any(Specifier::names_prerelease);
        if candidate.is_prerelease() && !allow_prereleases {
            return false;
        }
        self.specifiers.iter().all(|s| s.contains(candidate))
    }

    /// Convenience wrapper for `"3.9" in spec_set` style checks.
    pub fn contains_str(&self, candidate: &str) -> bool {
        Version::parse(candidate).is_ok_and(|v| self.contains(&v))
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
        f.write_str(&clauses.join(","))
    }
}

pub fn fixup_requires_python(raw: &str) -> String {
    raw.replace(".*", "")
        .replace('*', "")
        .replace('"', "")
        .replace("0<", "0,<")
        .replace("3<", "3,<")
}
