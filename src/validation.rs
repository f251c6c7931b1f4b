//! Input validation for flight schedules.
//!
//! Checks the externally supplied flight data before a schedule is built.
//! Detects:
//! - Missing departure or arrival times
//! - Unknown IANA timezone names
//! - Unparseable or nonexistent local times (DST gaps)
//! - Non-positive flight durations
//!
//! All problems are collected rather than stopping at the first one.
//!
//! # Accepted Time Formats
//! - RFC 3339 with an explicit offset (`2024-01-01T08:00:00Z`); the offset wins
//! - Local wall-clock time in the airport's zone: `YYYY-MM-DDTHH:MM[:SS[.fff]]`,
//!   or the same with a space instead of `T`

use chrono::{DateTime, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::time::hours_between;
use crate::models::Flight;

const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Validation result.
pub type ValidationResult<T> = Result<T, Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Departure or arrival time is empty.
    MissingInstant,
    /// A time string matches no accepted format.
    InvalidInstant,
    /// A local time does not exist in its zone (DST gap).
    NonexistentLocalTime,
    /// A timezone name is not a known IANA identifier.
    UnknownTimezone,
    /// Arrival is not after departure.
    NonPositiveDuration,
    /// A time of day is not `HH:mm`.
    InvalidClockTime,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A flight with both ends resolved to UTC instants and offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFlight {
    /// Departure instant.
    pub departure: DateTime<Utc>,
    /// Arrival instant.
    pub arrival: DateTime<Utc>,
    /// Origin zone.
    pub origin_tz: Tz,
    /// Destination zone.
    pub destination_tz: Tz,
    /// Origin UTC offset at departure (seconds).
    pub origin_offset_secs: i32,
    /// Destination UTC offset at arrival (seconds).
    pub destination_offset_secs: i32,
}

impl ResolvedFlight {
    /// Departure-to-arrival duration (hours).
    pub fn duration_hours(&self) -> f64 {
        hours_between(self.departure, self.arrival)
    }

    /// Destination minus origin UTC offset (hours).
    pub fn timezone_diff_hours(&self) -> f64 {
        (self.destination_offset_secs - self.origin_offset_secs) as f64 / 3600.0
    }
}

/// Validates a flight against its origin and destination zones.
///
/// Checks:
/// 1. Both zone names are known IANA identifiers
/// 2. Departure and arrival times are present
/// 3. Both times parse and exist in their zones
/// 4. Arrival is strictly after departure
///
/// # Returns
/// The resolved flight if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_flight(
    flight: &Flight,
    origin_tz: &str,
    destination_tz: &str,
) -> ValidationResult<ResolvedFlight> {
    let mut errors = Vec::new();

    let origin = parse_timezone(origin_tz).map_err(|e| errors.push(e)).ok();
    let destination = parse_timezone(destination_tz)
        .map_err(|e| errors.push(e))
        .ok();

    let departure = origin.and_then(|tz| {
        parse_instant("departure", &flight.departure_time, tz)
            .map_err(|e| errors.push(e))
            .ok()
    });
    let arrival = destination.and_then(|tz| {
        parse_instant("arrival", &flight.arrival_time, tz)
            .map_err(|e| errors.push(e))
            .ok()
    });

    let (Some(origin_tz), Some(destination_tz), Some(departure), Some(arrival)) =
        (origin, destination, departure, arrival)
    else {
        return Err(errors);
    };

    if arrival <= departure {
        errors.push(ValidationError::new(
            ValidationErrorKind::NonPositiveDuration,
            format!(
                "Flight {} arrives ({arrival}) before it departs ({departure})",
                flight.route()
            ),
        ));
        return Err(errors);
    }

    Ok(ResolvedFlight {
        departure,
        arrival,
        origin_tz,
        destination_tz,
        origin_offset_secs: utc_offset_secs(origin_tz, departure),
        destination_offset_secs: utc_offset_secs(destination_tz, arrival),
    })
}

/// Parses an IANA zone identifier (e.g. `"Asia/Shanghai"`).
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.trim().parse::<Tz>().map_err(|_| {
        ValidationError::new(
            ValidationErrorKind::UnknownTimezone,
            format!("Unknown timezone '{name}'"),
        )
    })
}

/// Parses a time string, interpreting offset-free values in `tz`.
pub fn parse_instant(field: &str, raw: &str, tz: Tz) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::new(
            ValidationErrorKind::MissingInstant,
            format!("Flight {field} time is missing"),
        ));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| {
            ValidationError::new(
                ValidationErrorKind::InvalidInstant,
                format!("Invalid {field} time '{raw}'"),
            )
        })?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            ValidationError::new(
                ValidationErrorKind::NonexistentLocalTime,
                format!("{field} time '{raw}' does not exist in {tz}"),
            )
        })
}

/// UTC offset of `tz` at `instant` (seconds east of UTC).
pub fn utc_offset_secs(tz: Tz, instant: DateTime<Utc>) -> i32 {
    tz.offset_from_utc_datetime(&instant.naive_utc())
        .fix()
        .local_minus_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_valid_local_times() {
        let flight = Flight::new("LHR", "PEK", "2024-01-01T08:00:00", "2024-01-02T00:00:00");
        let resolved = validate_flight(&flight, "Europe/London", "Asia/Shanghai").unwrap();
        assert_eq!(
            resolved.departure,
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(
            resolved.arrival,
            Utc.with_ymd_and_hms(2024, 1, 1, 16, 0, 0).unwrap()
        );
        assert!((resolved.duration_hours() - 8.0).abs() < 1e-12);
        assert!((resolved.timezone_diff_hours() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_rfc3339_offset_wins() {
        let flight = Flight::new("A", "B", "2024-01-01T08:00:00Z", "2024-01-01T16:00:00Z");
        let resolved = validate_flight(&flight, "UTC", "America/New_York").unwrap();
        assert!((resolved.duration_hours() - 8.0).abs() < 1e-12);
        assert!((resolved.timezone_diff_hours() + 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_space_separated_format() {
        let tz = parse_timezone("UTC").unwrap();
        let t = parse_instant("departure", "2024-03-05 10:30", tz).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_missing_and_invalid() {
        let flight = Flight::new("A", "B", "", "tomorrow-ish");
        let errors = validate_flight(&flight, "UTC", "UTC").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ValidationErrorKind::MissingInstant);
        assert_eq!(errors[1].kind, ValidationErrorKind::InvalidInstant);
    }

    #[test]
    fn test_unknown_timezone() {
        let flight = Flight::new("A", "B", "2024-01-01T08:00", "2024-01-01T10:00");
        let errors = validate_flight(&flight, "Mars/Olympus", "UTC").unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownTimezone));
    }

    #[test]
    fn test_dst_gap() {
        // Clocks jump 01:00 → 02:00 in London on 2024-03-31
        let tz = parse_timezone("Europe/London").unwrap();
        let err = parse_instant("departure", "2024-03-31T01:30", tz).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::NonexistentLocalTime);
    }

    #[test]
    fn test_arrival_before_departure() {
        let flight = Flight::new("A", "B", "2024-01-01T10:00", "2024-01-01T09:00");
        let errors = validate_flight(&flight, "UTC", "UTC").unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::NonPositiveDuration);
    }

    #[test]
    fn test_error_display() {
        let e = ValidationError::new(ValidationErrorKind::UnknownTimezone, "Unknown timezone 'X'");
        assert_eq!(e.to_string(), "Unknown timezone 'X'");
    }
}
