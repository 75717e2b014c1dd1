//! Wheel filename grammar:
//! `{name}-{version}(-{build})?-{python tag}-{abi tag}-{platform tag}.whl`.

use std::sync::LazyLock;

use pyo3::prelude::*;
use regex::Regex;

static WHEEL_INFO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<name>[^-]+?)-(?P<ver>[^-]+?)(?:-(?P<build>\d[^-]*))?-(?P<pyver>[^-]+?)-(?P<abi>[^-]+?)-(?P<plat>[^-]+?)\.whl$",
    )
    .unwrap()
});

/// The fields of a wheel filename, kept verbatim.
///
/// `python_tag` and `platform_tag` may be compressed tag sets such as
/// `py2.py3` or `manylinux1_x86_64.manylinux2010_x86_64`.
#[pyclass(frozen, get_all)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WheelFilename {
    pub name: String,
    pub version: String,
    pub build_tag: Option<String>,
    pub python_tag: String,
    pub abi_tag: String,
    pub platform_tag: String,
}

impl WheelFilename {
    /// Returns `None` for anything that is not a well-formed wheel filename.
    pub fn parse(filename: &str) -> Option<Self> {
        let caps = WHEEL_INFO_RE.captures(filename)?;
        Some(Self {
            name: caps["name"].to_string(),
            version: caps["ver"].to_string(),
            build_tag: caps.name("build").map(|m| m.as_str().to_string()),
            python_tag: caps["pyver"].to_string(),
            abi_tag: caps["abi"].to_string(),
            platform_tag: caps["plat"].to_string(),
        })
    }

    /// Individual interpreter tags; some uploads use `,` instead of `.`.
    pub fn python_tags(&self) -> impl Iterator<Item = &str> {
        self.python_tag.split(['.', ','])
    }

    pub fn platform_tags(&self) -> impl Iterator<Item = &str> {
        self.platform_tag.split('.')
    }

    pub fn is_manylinux(&self) -> bool {
        self.platform_tag.contains("manylinux")
    }

    pub fn to_filename(&self) -> String {
        let mut parts = vec![self.name.as_str(), self.version.as_str()];
        if let Some(build) = &self.build_tag {
            parts.push(build);
        }
        parts.extend([
            self.python_tag.as_str(),
            self.abi_tag.as_str(),
            self.platform_tag.as_str(),
        ]);
        format!("{}.whl", parts.join("-"))
    }
}

#[pymethods]
impl WheelFilename {
    #[getter(python_tags)]
    fn py_python_tags(&self) -> Vec<String> {
        self.python_tags().map(str::to_string).collect()
    }

    #[getter(platform_tags)]
    fn py_platform_tags(&self) -> Vec<String> {
        self.platform_tags().map(str::to_string).collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "WheelFilename(name={:?}, version={:?}, build_tag={:?}, python_tag={:?}, \
             abi_tag={:?}, platform_tag={:?})",
            self.name,
            self.version,
            self.build_tag,
            self.python_tag,
            self.abi_tag,
            self.platform_tag,
        )
    }
}

#[pyfunction]
pub fn parse_wheel_filename(filename: &str) -> Option<WheelFilename> {
    WheelFilename::parse(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compound_platform() {
        let wheel = WheelFilename::parse(
            "numpy-1.21.0-cp39-cp39-manylinux_2_17_x86_64.manylinux2014_x86_64.whl",
        )
        .unwrap();
        assert_eq!(wheel.name, "numpy");
        assert_eq!(wheel.version, "1.21.0");
        assert_eq!(wheel.build_tag, None);
        assert_eq!(wheel.python_tag, "cp39");
        assert_eq!(wheel.abi_tag, "cp39");
        let platforms: Vec<&str> = wheel.platform_tags().collect();
        assert_eq!(
            platforms,
            vec!["manylinux_2_17_x86_64", "manylinux2014_x86_64"]
        );
        assert!(wheel.is_manylinux());
    }

    #[test]
    fn test_parse_build_tag() {
        let wheel =
            WheelFilename::parse("pkg-2.0-1build-py2.py3-none-manylinux1_i686.whl").unwrap();
        assert_eq!(wheel.build_tag.as_deref(), Some("1build"));
        let pythons: Vec<&str> = wheel.python_tags().collect();
        assert_eq!(pythons, vec!["py2", "py3"]);
        assert_eq!(
            wheel.to_filename(),
            "pkg-2.0-1build-py2.py3-none-manylinux1_i686.whl"
        );
    }

    #[test]
    fn test_comma_separated_python_tag() {
        let wheel = WheelFilename::parse("pkg-1.0-cp36,cp37-cp36m-manylinux1_x86_64.whl").unwrap();
        let pythons: Vec<&str> = wheel.python_tags().collect();
        assert_eq!(pythons, vec!["cp36", "cp37"]);
    }

    #[test]
    fn test_suffix_is_case_insensitive() {
        assert!(WheelFilename::parse("pkg-1.0-py3-none-any.WHL").is_some());
    }

    #[test]
    fn test_rejects_malformed_names() {
        for bad in [
            "pkg-1.0.tar.gz",
            "pkg-1.0-py3-none.whl",
            "pkg-1.0-py3-none-any.zip",
            "ut-1.zip",
            "-1.0-py3-none-any.whl",
            "",
        ] {
            assert!(WheelFilename::parse(bad).is_none(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_non_manylinux_platform() {
        let wheel = WheelFilename::parse("pkg-1.0-cp38-cp38-win_amd64.whl").unwrap();
        assert!(!wheel.is_manylinux());
    }
}
