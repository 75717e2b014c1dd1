//! Timeline core library: wheel metadata parsing and release filtering for
//! the manylinux adoption timeline.
//!
//! The crate turns cached package-index release information into dataset
//! rows (one per retained release, with its supported interpreters and
//! manylinux platforms) and into per-interpreter wheel support windows used
//! to label consumer downloads.  It is compiled as a Python extension module
//! (`_timeline_core`) via PyO3 and driven by the pipeline scripts.

pub mod calendar;
pub mod config;
pub mod consumer;
pub mod dataset;
pub mod errors;
pub mod logging;
pub mod models;
pub mod parallel;
pub mod pep440;
pub mod wheel;

#[cfg(test)]
mod testing;

use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

// ---------------------------------------------------------------------------
// Top-level Python module: _timeline_core
// ---------------------------------------------------------------------------

#[pymodule]
fn _timeline_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(logging::init_logging, m)?)?;

    // -- Models ---------------------------------------------------------------
    m.add_class::<models::Row>()?;
    m.add_function(wrap_pyfunction!(models::canonicalize_name, m)?)?;

    // -- Wheel filenames -------------------------------------------------------
    m.add_class::<wheel::WheelFilename>()?;
    m.add_function(wrap_pyfunction!(wheel::filename::parse_wheel_filename, m)?)?;

    // -- Dataset -----------------------------------------------------------------
    m.add_class::<dataset::ClassifiedRelease>()?;
    m.add_function(wrap_pyfunction!(dataset::classifier::py_classify_release, m)?)?;
    m.add_function(wrap_pyfunction!(dataset::selector::py_select_versions, m)?)?;
    m.add_function(wrap_pyfunction!(dataset::rows::py_package_rows, m)?)?;
    m.add_function(wrap_pyfunction!(dataset::rows::py_update_dataset, m)?)?;
    m.add_function(wrap_pyfunction!(dataset::trim::py_trim_release_info, m)?)?;
    m.add_function(wrap_pyfunction!(
        dataset::filters::py_latest_stable_version,
        m
    )?)?;
    m.add_function(wrap_pyfunction!(dataset::filters::py_package_filter, m)?)?;

    // -- Consumer ----------------------------------------------------------------
    m.add_function(wrap_pyfunction!(
        consumer::support::py_build_wheel_support_map,
        m
    )?)?;
    m.add_function(wrap_pyfunction!(consumer::downloads::major_minor, m)?)?;
    m.add_function(wrap_pyfunction!(consumer::downloads::glibc_group, m)?)?;
    m.add_class::<consumer::DownloadLabeler>()?;

    // -- Calendar ----------------------------------------------------------------
    m.add_function(wrap_pyfunction!(calendar::week_start, m)?)?;
    m.add_function(wrap_pyfunction!(calendar::to_week_str, m)?)?;
    m.add_function(wrap_pyfunction!(calendar::from_week_str, m)?)?;
    m.add_function(wrap_pyfunction!(calendar::week_delta, m)?)?;
    m.add_function(wrap_pyfunction!(calendar::window_size, m)?)?;

    Ok(())
}
