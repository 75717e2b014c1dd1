pub mod specifier;
pub mod version;

pub use specifier::{Specifier, SpecifierSet};
pub use version::Version;
