//! Fixed dates of the mystery.
//!
//! All timestamps are naive and committed as UTC.

use chrono::{NaiveDate, NaiveDateTime};

fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, min, 0))
        .unwrap_or_default()
}

/// Founding of Git Town; base and street commits carry this date.
pub fn date_start() -> NaiveDateTime {
    at(2019, 1, 1, 0, 0)
}

pub fn date_end() -> NaiveDateTime {
    at(2019, 12, 31, 23, 59)
}

/// Timestamp of the main crime scene report.
pub fn date_report() -> NaiveDateTime {
    at(2019, 7, 24, 21, 44)
}

/// Inclusive start of the report week.
pub fn report_week_start() -> NaiveDateTime {
    at(2019, 7, 22, 0, 0)
}

/// Exclusive end of the report week.
pub fn report_week_end() -> NaiveDateTime {
    at(2019, 7, 29, 0, 0)
}

pub fn murder_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 7, 23).unwrap_or_default()
}

/// Whether `when` falls inside `[report_week_start, report_week_end)`.
pub fn in_report_week(when: NaiveDateTime) -> bool {
    report_week_start() <= when && when < report_week_end()
}
