//! On-disk release cache: one trimmed release-info JSON document per package.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::TimelineResult;
use crate::models::{canonicalize_name, ReleaseInfo};

const INFO_DIR: &str = "info";

#[derive(Clone, Debug)]
pub struct ReleaseCache {
    root: PathBuf,
}

impl ReleaseCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/info/<canonical name>.json`
    pub fn path(&self, package: &str) -> PathBuf {
        self.root
            .join(INFO_DIR)
            .join(format!("{}.json", canonicalize_name(package)))
    }

    pub fn exists(&self, package: &str) -> bool {
        self.path(package).is_file()
    }

    /// Load the cached release info; `Ok(None)` when the package has no cache
    /// file.
    pub fn load(&self, package: &str) -> TimelineResult<Option<ReleaseInfo>> {
        let path = self.path(package);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(ReleaseInfo::from_json(&content)?))
    }

    /// Like [`ReleaseCache::load`], but unreadable or corrupt files are
    /// logged and reported as missing.
    pub fn load_or_skip(&self, package: &str) -> Option<ReleaseInfo> {
        match self.load(package) {
            Ok(info) => info,
            Err(e) => {
                warn!(
                    "\"{package}\": ignoring release cache {}: {e}",
                    self.path(package).display()
                );
                None
            }
        }
    }

    pub fn store(&self, package: &str, info: &ReleaseInfo) -> TimelineResult<()> {
        let path = self.path(package);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string(info)?)?;
        debug!("\"{package}\": wrote {}", path.display());
        Ok(())
    }
}
