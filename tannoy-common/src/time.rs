//! Wall-clock helpers for event matching

use chrono::{DateTime, Datelike, Local};

use crate::model::{DayOfWeek, TimeOfDay};

/// Get current local timestamp
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Symbolic day of week a timestamp falls on
pub fn day_of(ts: &DateTime<Local>) -> DayOfWeek {
    DayOfWeek::from(ts.weekday())
}

/// Minute slot a timestamp falls into
pub fn minute_of(ts: &DateTime<Local>) -> TimeOfDay {
    TimeOfDay::from_datetime(ts)
}
