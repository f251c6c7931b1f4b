//! Conversions between fractional hours and `chrono` durations.
//!
//! The numerical stages work in elapsed hours (f64) relative to the
//! schedule start; instants are stored as `DateTime<Utc>`. Conversion goes
//! through whole milliseconds.

use chrono::{DateTime, Duration, Utc};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Converts fractional hours to a duration (rounded to the nearest ms).
#[inline]
pub fn hours_to_duration(hours: f64) -> Duration {
    Duration::milliseconds((hours * MS_PER_HOUR).round() as i64)
}

/// Converts a duration to fractional hours.
#[inline]
pub fn duration_hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / MS_PER_HOUR
}

/// Fractional hours from `from` to `to` (negative if `to` is earlier).
#[inline]
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    duration_hours(to - from)
}

/// `origin + hours`.
#[inline]
pub fn add_hours(origin: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
    origin + hours_to_duration(hours)
}
