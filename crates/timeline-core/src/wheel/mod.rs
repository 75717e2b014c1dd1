//! Wheel filename parsing and interpreter tag normalization.

pub mod filename;
pub mod tags;

pub use filename::WheelFilename;
pub use tags::{PythonSupportTag, TagVersion};
