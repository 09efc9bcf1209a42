//! # General Helpers
//!
//! Time and number helpers used across loggers and market clients.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Returns the current UTC time as an RFC 9557 / RFC 3339 string with
/// millisecond precision and a `Z` suffix (e.g. `2024-01-15T14:30:00.123Z`).
pub fn current_datetime_rfc9557() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Converts a Unix timestamp (seconds) into its UTC calendar date.
///
/// Returns `None` when the timestamp is outside chrono's representable range.
pub fn epoch_to_date(ts: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

/// Converts a calendar date into the Unix timestamp of its UTC midnight.
pub fn date_to_epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Rounds `value` to `places` decimal digits, half away from zero.
///
/// Non-finite values are returned unchanged.
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
