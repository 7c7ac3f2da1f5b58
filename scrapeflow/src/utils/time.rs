//! Date and timestamp formatting.

use chrono::{Local, NaiveDate, Utc};

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Today's local date.
#[must_use]
pub fn current_date() -> NaiveDate {
    Local::now().date_naive()
}

/// Today's local date as `YYYY-MM-DD`.
#[must_use]
pub fn current_date_str() -> String {
    current_date().format("%Y-%m-%d").to_string()
}
