//! Canonical interpreter-support tags.
//!
//! Wheel python tags are normalized into [`PythonSupportTag`] values.  They
//! are only flattened back into the `.`-joined string form (`py2.abi3.cp36`)
//! when a row is written.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static FREE_THREADED_ABI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^cp3(1[3-9]|[2-9][0-9])t$").unwrap());

/// Whether an ABI tag names a free-threaded CPython build (`cp313t`, ...).
pub fn is_free_threaded_abi(abi: &str) -> bool {
    FREE_THREADED_ABI_RE.is_match(abi)
}

/// The digits of an interpreter tag: `3` for `py3`, `3.11` for `cp311`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagVersion {
    pub major: u32,
    pub minor: Option<u32>,
}

impl TagVersion {
    pub fn new(major: u32, minor: Option<u32>) -> Self {
        Self { major, minor }
    }

    fn parse(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let (major, minor) = digits.split_at(1);
        let major = major.parse().ok()?;
        let minor = if minor.is_empty() {
            None
        } else {
            Some(minor.parse().ok()?)
        };
        Some(Self { major, minor })
    }

    /// The tag digits read as one integer (`311` for 3.11); the primary sort
    /// key of the serialized tag list.
    pub fn number(&self) -> u64 {
        match self.minor {
            None => u64::from(self.major),
            Some(minor) => {
                let mut scale = 10u64;
                while scale <= u64::from(minor) {
                    scale *= 10;
                }
                u64::from(self.major) * scale + u64::from(minor)
            }
        }
    }

    /// `"3.11"` style key; `None` for major-only tags.
    pub fn python_key(&self) -> Option<String> {
        self.minor.map(|minor| format!("{}.{minor}", self.major))
    }
}

impl fmt::Display for TagVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}{minor}", self.major),
            None => write!(f, "{}", self.major),
        }
    }
}

/// Interpreter support advertised by a release.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PythonSupportTag {
    CPython(TagVersion),
    PyPy(TagVersion),
    GraalPy(TagVersion),
    Pyston(TagVersion),
    /// `py*` tags: pure-python or otherwise interpreter-agnostic wheels.
    SourceOnly(TagVersion),
    /// Any other two-letter implementation prefix (`ip27`, `jy27`, ...).
    Other { prefix: String, version: TagVersion },
    /// The lowest `CPython` 3 tag of the release and every newer minor are
    /// supported through the stable ABI.
    StableAbi,
    FreeThreaded,
}

impl PythonSupportTag {
    /// Parse one interpreter tag such as `cp39`, `py3` or `graalpy311`.
    pub fn parse(raw: &str) -> Option<Self> {
        let remapped;
        let tag = if let Some(rest) = raw.strip_prefix("graalpy") {
            remapped = format!("gp{rest}");
            remapped.as_str()
        } else if let Some(rest) = raw.strip_prefix("pyston") {
            remapped = format!("pt{rest}");
            remapped.as_str()
        } else {
            raw
        };
        if !tag.is_char_boundary(2) || tag.len() < 3 {
            return None;
        }
        let (prefix, digits) = tag.split_at(2);
        let version = TagVersion::parse(digits)?;
        Some(match prefix {
            "cp" => PythonSupportTag::CPython(version),
            "pp" => PythonSupportTag::PyPy(version),
            "gp" => PythonSupportTag::GraalPy(version),
            "pt" => PythonSupportTag::Pyston(version),
            "py" => PythonSupportTag::SourceOnly(version),
            other => PythonSupportTag::Other {
                prefix: other.to_string(),
                version,
            },
        })
    }

    pub fn prefix(&self) -> &str {
        match self {
            PythonSupportTag::CPython(_) => "cp",
            PythonSupportTag::PyPy(_) => "pp",
            PythonSupportTag::GraalPy(_) => "gp",
            PythonSupportTag::Pyston(_) => "pt",
            PythonSupportTag::SourceOnly(_) => "py",
            PythonSupportTag::Other { prefix, .. } => prefix,
            PythonSupportTag::StableAbi => "ab",
            PythonSupportTag::FreeThreaded => "ft",
        }
    }

    /// Interpreter version for interpreter tags; `None` for the markers.
    pub fn version(&self) -> Option<TagVersion> {
        match self {
            PythonSupportTag::CPython(v)
            | PythonSupportTag::PyPy(v)
            | PythonSupportTag::GraalPy(v)
            | PythonSupportTag::Pyston(v)
            | PythonSupportTag::SourceOnly(v) => Some(*v),
            PythonSupportTag::Other { version, .. } => Some(*version),
            PythonSupportTag::StableAbi | PythonSupportTag::FreeThreaded => None,
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            PythonSupportTag::StableAbi | PythonSupportTag::FreeThreaded
        )
    }

    /// A compiled-implementation tag without minor digits (`cp3`, `pp3`).
    pub fn lacks_minor(&self) -> bool {
        match self {
            PythonSupportTag::CPython(v)
            | PythonSupportTag::PyPy(v)
            | PythonSupportTag::GraalPy(v)
            | PythonSupportTag::Pyston(v) => v.minor.is_none(),
            _ => false,
        }
    }

    /// The bare `py3` tag, which needs `requires_python` to be meaningful.
    pub fn is_bare_py3(&self) -> bool {
        *self == PythonSupportTag::SourceOnly(TagVersion::new(3, None))
    }

    pub fn is_cpython3(&self) -> bool {
        matches!(self, PythonSupportTag::CPython(v) if v.major == 3)
    }

    pub fn is_source_py3(&self) -> bool {
        matches!(self, PythonSupportTag::SourceOnly(v) if v.major == 3)
    }

    pub fn is_py2_only(&self) -> bool {
        matches!(self, PythonSupportTag::SourceOnly(v) if v.major == 2)
    }

    fn sort_number(&self) -> u64 {
        match self.version() {
            Some(version) => version.number(),
            None => 3,
        }
    }
}

impl Ord for PythonSupportTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_number()
            .cmp(&other.sort_number())
            .then_with(|| self.prefix().cmp(other.prefix()))
    }
}

impl PartialOrd for PythonSupportTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PythonSupportTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PythonSupportTag::StableAbi => f.write_str("abi3"),
            PythonSupportTag::FreeThreaded => f.write_str("free-threaded"),
            other => match other.version() {
                Some(version) => write!(f, "{}{version}", other.prefix()),
                None => Ok(()),
            },
        }
    }
}

/// Flatten a sorted tag set into the stored `.`-joined form.
pub fn join_tags<'a>(tags: impl IntoIterator<Item = &'a PythonSupportTag>) -> String {
    tags.into_iter()
        .map(|tag| tag.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
