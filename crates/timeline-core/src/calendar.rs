//! ISO-week helpers shared by the dataset and statistics layers.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use pyo3::prelude::*;

use crate::errors::{TimelineError, TimelineResult};

pub const WEEK_DAYS: i64 = 7;
pub const WINDOW_WEEKS: i64 = 26;

#[pyfunction]
pub fn week_delta() -> Duration {
    Duration::days(WEEK_DAYS)
}

/// Width of the sliding window used for producer statistics.
#[pyfunction]
pub fn window_size() -> Duration {
    Duration::days(WEEK_DAYS * WINDOW_WEEKS)
}

/// Monday of the ISO week containing `day`.
#[pyfunction]
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// `YYYY-WW` label of the ISO week containing `day`.
#[pyfunction]
pub fn to_week_str(day: NaiveDate) -> String {
    let week = day.iso_week();
    format!("{:04}-{:02}", week.year(), week.week())
}

pub fn from_week_str_impl(label: &str) -> TimelineResult<NaiveDate> {
    let invalid = || TimelineError::Config(format!("invalid week label '{label}'"));
    let (year, week) = label.split_once('-').ok_or_else(invalid)?;
    let year = year.trim().parse::<i32>().map_err(|_| invalid())?;
    let week = week.trim().parse::<u32>().map_err(|_| invalid())?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(invalid)
}

/// Monday of the ISO week named by a `YYYY-WW` label.
#[pyfunction]
pub fn from_week_str(label: &str) -> PyResult<NaiveDate> {
    Ok(from_week_str_impl(label)?)
}
