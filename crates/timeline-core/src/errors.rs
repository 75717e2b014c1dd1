//! Error types for the timeline core library.

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::PyErr;

/// Top-level error enum for the timeline core library.
///
/// Data-quality problems in release metadata are never reported through this
/// type; they are logged and skipped where they occur.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid version: {0}")]
    Version(String),

    #[error("Invalid specifier: {0}")]
    Specifier(String),

    #[error("Filter error: {0}")]
    Filter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TimelineError> for PyErr {
    fn from(err: TimelineError) -> PyErr {
        match &err {
            TimelineError::Io(_) => PyIOError::new_err(err.to_string()),
            TimelineError::Config(_)
            | TimelineError::Version(_)
            | TimelineError::Specifier(_)
            | TimelineError::Filter(_)
            | TimelineError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type TimelineResult<T> = Result<T, TimelineError>;
