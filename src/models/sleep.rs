//! Habitual sleep schedule.
//!
//! Bedtime and wake time are times of day with no date. They are projected
//! onto calendar days in the origin timezone when sleep windows are built.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::validation::{ValidationError, ValidationErrorKind};

/// A traveler's usual bedtime and wake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepSchedule {
    /// Time of day the traveler goes to sleep.
    pub bedtime: NaiveTime,
    /// Time of day the traveler wakes up.
    pub wakeup_time: NaiveTime,
}

impl Default for SleepSchedule {
    /// 22:00 to 06:00.
    fn default() -> Self {
        Self {
            bedtime: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            wakeup_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
        }
    }
}

impl SleepSchedule {
    /// Creates a schedule from two times of day.
    pub fn new(bedtime: NaiveTime, wakeup_time: NaiveTime) -> Self {
        Self {
            bedtime,
            wakeup_time,
        }
    }

    /// Parses `"HH:mm"` strings (e.g. `"22:30"`, `"06:30"`).
    ///
    /// Both fields are checked; every malformed field is reported.
    ///
    /// ```
    /// use jetshift::models::SleepSchedule;
    ///
    /// let s = SleepSchedule::parse("23:15", "07:00").unwrap();
    /// assert_eq!(s.bedtime_hour(), 23);
    /// assert!(SleepSchedule::parse("25:00", "7am").is_err());
    /// ```
    pub fn parse(bedtime: &str, wakeup_time: &str) -> Result<Self, Vec<ValidationError>> {
        let bed = parse_clock_time("bedtime", bedtime);
        let wake = parse_clock_time("wakeup time", wakeup_time);
        match (bed, wake) {
            (Ok(bedtime), Ok(wakeup_time)) => Ok(Self::new(bedtime, wakeup_time)),
            (bed, wake) => Err(bed.err().into_iter().chain(wake.err()).collect()),
        }
    }

    /// Bedtime hour (0-23), the phase reference of the entrainment term.
    #[inline]
    pub fn bedtime_hour(&self) -> u32 {
        self.bedtime.hour()
    }

    /// Sleep length in hours, wrapping past midnight.
    pub fn sleep_hours(&self) -> f64 {
        let secs = (self.wakeup_time - self.bedtime).num_seconds();
        let secs = if secs <= 0 { secs + 86_400 } else { secs };
        secs as f64 / 3600.0
    }
}

fn parse_clock_time(field: &str, raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
        ValidationError::new(
            ValidationErrorKind::InvalidClockTime,
            format!("Invalid {field} '{raw}': expected HH:mm"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let s = SleepSchedule::parse("22:30", "06:30").unwrap();
        assert_eq!(s.bedtime, NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        assert_eq!(s.wakeup_time, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert_eq!(s.bedtime_hour(), 22);
    }

    #[test]
    fn test_parse_reports_both_fields() {
        let errors = SleepSchedule::parse("nope", "31:00").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationErrorKind::InvalidClockTime));
        assert!(errors[0].message.contains("bedtime"));
        assert!(errors[1].message.contains("wakeup"));
    }

    #[test]
    fn test_default_schedule() {
        let s = SleepSchedule::default();
        assert_eq!(s, SleepSchedule::parse("22:00", "06:00").unwrap());
        assert!((s.sleep_hours() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_sleep_hours_same_day() {
        let s = SleepSchedule::parse("01:00", "09:30").unwrap();
        assert!((s.sleep_hours() - 8.5).abs() < 1e-12);
    }
}
