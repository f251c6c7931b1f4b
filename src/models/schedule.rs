//! Switching schedule (solution) model.
//!
//! A switching schedule is an ordered list of instants at which light
//! exposure flips between `Light` and `Dark` over the window `[t0, tf]`.
//!
//! # Point Semantics
//! Each [`SwitchingPoint`] closes the phase that precedes it: point `j`
//! with phase `p` means `p` is active over `[t_{j-1}, t_j)`, with
//! `t_{-1} = t0`. The last point normally sits at `tf`.
//!
//! # Reference
//! Kirk (2004), "Optimal Control Theory: An Introduction", Ch. 5 (bang-bang control)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sleep::SleepSchedule;
use super::time::hours_between;
use crate::validation::ValidationError;

/// Exposure phase of a control interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Bright light exposure (control `u1`).
    Light,
    /// Darkness / light avoidance (control `u0`).
    Dark,
}

impl Phase {
    /// The other phase.
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Phase::Light => Phase::Dark,
            Phase::Dark => Phase::Light,
        }
    }
}

/// Travel direction, from the sign of the timezone difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Destination ahead of origin (phase advance needed).
    Eastbound,
    /// Destination behind (or level with) origin.
    Westbound,
}

impl Direction {
    /// Positive difference is eastbound; zero and negative are westbound.
    pub fn from_timezone_diff(timezone_diff_hours: f64) -> Self {
        if timezone_diff_hours > 0.0 {
            Direction::Eastbound
        } else {
            Direction::Westbound
        }
    }
}

/// A control switch at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchingPoint {
    /// When the phase ends.
    pub time: DateTime<Utc>,
    /// Phase active up to `time`.
    pub phase: Phase,
}

impl SwitchingPoint {
    /// Creates a switching point.
    pub fn new(time: DateTime<Utc>, phase: Phase) -> Self {
        Self { time, phase }
    }
}

/// A complete light/dark exposure schedule for one flight.
///
/// Built by [`ScheduleInitializer`](crate::initializer::ScheduleInitializer)
/// and refined by the convergence controller, which only ever replaces
/// `switching_points`. All other stages treat it as an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchingSchedule {
    /// Window start (departure).
    pub t0: DateTime<Utc>,
    /// Window end (arrival plus one rest cycle).
    pub tf: DateTime<Utc>,
    /// Chronologically ordered switch instants, each within `[t0, tf]`.
    pub switching_points: Vec<SwitchingPoint>,
    /// Destination minus origin UTC offset (hours, signed).
    pub timezone_diff_hours: f64,
    /// Travel direction.
    pub direction: Direction,
    /// Departure-to-arrival duration (hours).
    pub flight_duration_hours: f64,
    /// Sleep schedule the schedule was built from.
    pub sleep_schedule: SleepSchedule,
    /// Dark-phase control level.
    pub u0: f64,
    /// Light-phase control level.
    pub u1: f64,
    /// Input problems that produced a sentinel schedule (empty otherwise).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationError>,
}

impl SwitchingSchedule {
    /// Creates a schedule with no switching points.
    pub fn new(
        t0: DateTime<Utc>,
        tf: DateTime<Utc>,
        timezone_diff_hours: f64,
        flight_duration_hours: f64,
        sleep_schedule: SleepSchedule,
    ) -> Self {
        Self {
            t0,
            tf,
            switching_points: Vec::new(),
            timezone_diff_hours,
            direction: Direction::from_timezone_diff(timezone_diff_hours),
            flight_duration_hours,
            sleep_schedule,
            u0: 0.0,
            u1: 1.0,
            validation_errors: Vec::new(),
        }
    }

    /// The sentinel returned for unusable input.
    ///
    /// Westbound, zero duration, no switching points, and both window
    /// ends pinned to the Unix epoch as an error marker.
    pub fn invalid(sleep_schedule: SleepSchedule, errors: Vec<ValidationError>) -> Self {
        let mut schedule = Self::new(
            DateTime::<Utc>::UNIX_EPOCH,
            DateTime::<Utc>::UNIX_EPOCH,
            0.0,
            0.0,
            sleep_schedule,
        );
        schedule.validation_errors = errors;
        schedule
    }

    /// Sets the switching points.
    pub fn with_points(mut self, points: Vec<SwitchingPoint>) -> Self {
        self.switching_points = points;
        self
    }

    /// Whether this is the invalid-input sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.switching_points.is_empty() && self.flight_duration_hours == 0.0
    }

    /// Whether the schedule was built without input problems.
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }

    /// Window length `tf - t0` (hours).
    pub fn window_hours(&self) -> f64 {
        hours_between(self.t0, self.tf)
    }

    /// Elapsed hours from `t0` to each switching point.
    pub fn switching_hours(&self) -> Vec<f64> {
        self.switching_points
            .iter()
            .map(|p| hours_between(self.t0, p.time))
            .collect()
    }

    /// Number of switching points.
    pub fn point_count(&self) -> usize {
        self.switching_points.len()
    }

    /// Whether points are in non-decreasing time order and inside `[t0, tf]`.
    pub fn is_well_formed(&self) -> bool {
        let ordered = self
            .switching_points
            .windows(2)
            .all(|w| w[0].time <= w[1].time);
        let bounded = self
            .switching_points
            .iter()
            .all(|p| p.time >= self.t0 && p.time <= self.tf);
        ordered && bounded
    }
}
