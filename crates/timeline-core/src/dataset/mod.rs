//! Producer-side dataset: release cache, classification, version selection
//! and the rows / filters derived from them.

pub mod cache;
pub mod classifier;
pub mod filters;
pub mod rows;
pub mod selector;
pub mod trim;

pub use cache::ReleaseCache;
pub use classifier::{classify_release, ClassifiedRelease};
pub use rows::{package_rows, update_dataset};
pub use selector::select_versions;
