//! Consumer-side adoption: wheel support windows and download labeling.

pub mod downloads;
pub mod support;

pub use downloads::{glibc_group, label_download, major_minor, past_end_of_life, DownloadLabeler};
pub use support::{build_wheel_support_map, package_support, PackageSupport, WheelSupportMap};
