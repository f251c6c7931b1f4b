//! Heuristic first-guess switching schedule.
//!
//! # Algorithm
//!
//! 1. Validate the flight; unusable input yields the sentinel schedule.
//! 2. Size the phases: the interval count grows with the timezone
//!    difference, capped so no phase is shorter than the minimum interval;
//!    the phase length is scaled by a direction factor, then per phase by
//!    the light or dark factor.
//! 3. Walk forward from departure alternating light/dark phases until the
//!    horizon (arrival plus one rest cycle).
//! 4. Whenever a phase would run into a sleep window, end it at bedtime,
//!    emit the sleep window as a dark block, and resume with light at
//!    wake time.
//!
//! Sleep windows are interpreted in origin local time.
//!
//! # Complexity
//! O(p · w) where p = emitted points, w = sleep windows (at most 2).
//!
//! # Reference
//! Eastman & Burgess (2009), "How to travel the world without jet lag"

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use tracing::{debug, warn};

use crate::config::{InitializerConfig, OptimizerConfig};
use crate::models::time::{add_hours, hours_between, hours_to_duration};
use crate::models::{
    Direction, Flight, Phase, SleepSchedule, SwitchingPoint, SwitchingSchedule,
};
use crate::validation::{validate_flight, ResolvedFlight};

/// Smallest phase the walk will ever take (hours).
const MIN_STEP_HOURS: f64 = 1.0 / 60.0;

/// A sleep window in hours relative to departure, `[bed, wake)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepWindow {
    /// Sleep onset (hours since departure).
    pub bed_hours: f64,
    /// Wake time (hours since departure).
    pub wake_hours: f64,
}

impl SleepWindow {
    /// Whether `hours` falls within the window.
    #[inline]
    pub fn contains(&self, hours: f64) -> bool {
        hours >= self.bed_hours && hours < self.wake_hours
    }
}

/// Builds the initial switching schedule from a flight and sleep habits.
///
/// # Example
///
/// ```
/// use jetshift::initializer::ScheduleInitializer;
/// use jetshift::models::{Direction, Flight, Phase, SleepSchedule};
///
/// let flight = Flight::new("LHR", "PEK", "2024-01-01T08:00:00", "2024-01-02T00:00:00");
/// let schedule = ScheduleInitializer::new().initialize(
///     &flight,
///     "Europe/London",
///     "Asia/Shanghai",
///     &SleepSchedule::default(),
/// );
///
/// assert_eq!(schedule.direction, Direction::Eastbound);
/// assert_eq!(schedule.switching_points[0].phase, Phase::Light);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScheduleInitializer {
    config: InitializerConfig,
}

impl ScheduleInitializer {
    /// Creates an initializer with default constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the initializer section of a pipeline config.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self::new().with_config(config.initializer.clone())
    }

    /// Sets the constants.
    pub fn with_config(mut self, config: InitializerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the first-guess schedule.
    ///
    /// Never fails: invalid flight data produces the sentinel schedule
    /// (no points, zero duration) carrying the validation errors.
    pub fn initialize(
        &self,
        flight: &Flight,
        origin_tz: &str,
        destination_tz: &str,
        sleep: &SleepSchedule,
    ) -> SwitchingSchedule {
        match validate_flight(flight, origin_tz, destination_tz) {
            Ok(resolved) => self.build(&resolved, sleep),
            Err(errors) => {
                warn!(
                    route = %flight.route(),
                    errors = errors.len(),
                    first = %errors.first().map(|e| e.message.as_str()).unwrap_or(""),
                    "invalid flight, returning sentinel schedule"
                );
                SwitchingSchedule::invalid(*sleep, errors)
            }
        }
    }

    /// Builds the schedule for an already validated flight.
    pub fn build(&self, flight: &ResolvedFlight, sleep: &SleepSchedule) -> SwitchingSchedule {
        let flight_hours = flight.duration_hours();
        let timezone_diff = flight.timezone_diff_hours();
        let t0 = flight.departure;
        let tf = flight.arrival + hours_to_duration(self.config.horizon_extension_hours);
        let horizon = hours_between(t0, tf);

        let phase_hours = self
            .phase_duration_hours(flight_hours, timezone_diff)
            .max(MIN_STEP_HOURS);
        let windows = sleep_windows(flight, sleep);
        let points = self.walk(t0, tf, horizon, phase_hours, &windows);

        debug!(
            flight_hours,
            timezone_diff,
            phase_hours,
            points = points.len(),
            "initialized switching schedule"
        );

        SwitchingSchedule::new(t0, tf, timezone_diff, flight_hours, *sleep).with_points(points)
    }

    /// Target number of phase intervals.
    ///
    /// `ceil(|Δtz| · scale)`, capped at `floor(flight / min_interval)`.
    pub fn interval_count(&self, flight_hours: f64, timezone_diff_hours: f64) -> usize {
        let wanted = (timezone_diff_hours.abs() * self.config.intervals_per_timezone_hour).ceil();
        let cap = if self.config.min_interval_hours > 0.0 {
            (flight_hours / self.config.min_interval_hours).floor()
        } else {
            wanted
        };
        wanted.min(cap).max(0.0) as usize
    }

    /// Phase length (hours), floored at the minimum interval.
    ///
    /// `flight · direction_factor / (intervals + 1)`.
    pub fn phase_duration_hours(&self, flight_hours: f64, timezone_diff_hours: f64) -> f64 {
        let direction = Direction::from_timezone_diff(timezone_diff_hours);
        let intervals = self.interval_count(flight_hours, timezone_diff_hours);
        let raw = flight_hours * self.config.direction_factor(direction) / (intervals + 1) as f64;
        raw.max(self.config.min_interval_hours)
    }

    fn walk(
        &self,
        t0: DateTime<Utc>,
        tf: DateTime<Utc>,
        horizon: f64,
        phase_hours: f64,
        windows: &[SleepWindow],
    ) -> Vec<SwitchingPoint> {
        let min_sub = self.config.min_sub_phase_hours;
        let at = |hours: f64| if hours >= horizon { tf } else { add_hours(t0, hours) };

        let mut points = Vec::new();
        let mut cursor = 0.0;
        let mut phase = Phase::Light;

        while cursor < horizon {
            // Already asleep: emit the remainder of the window as dark.
            if let Some(w) = windows.iter().find(|w| w.contains(cursor)) {
                let end = snap_to_horizon(w.wake_hours, horizon, min_sub);
                points.push(SwitchingPoint::new(at(end), Phase::Dark));
                cursor = end;
                phase = Phase::Light;
                continue;
            }

            let length = (phase_hours * self.config.phase_factor(phase)).max(MIN_STEP_HOURS);
            let next = snap_to_horizon(cursor + length, horizon, min_sub);

            if let Some(w) = windows
                .iter()
                .find(|w| w.bed_hours > cursor && w.bed_hours < next)
            {
                if w.bed_hours - cursor >= min_sub {
                    points.push(SwitchingPoint::new(at(w.bed_hours), phase));
                }
                let end = snap_to_horizon(w.wake_hours, horizon, min_sub);
                points.push(SwitchingPoint::new(at(end), Phase::Dark));
                cursor = end;
                phase = Phase::Light;
                continue;
            }

            points.push(SwitchingPoint::new(at(next), phase));
            cursor = next;
            phase = phase.flipped();
        }

        if points.last().map(|p| p.time) != Some(tf) {
            points.push(SwitchingPoint::new(tf, phase));
        }
        points
    }
}

/// Clamps `hours` to the horizon, absorbing a tail shorter than `min_sub`.
fn snap_to_horizon(hours: f64, horizon: f64, min_sub: f64) -> f64 {
    if horizon - hours < min_sub {
        horizon
    } else {
        hours
    }
}

/// Sleep windows on the departure's local date and the following date.
///
/// Bedtime and wake time are projected onto each date in the origin
/// zone; a wake time earlier than bedtime rolls to the next day. Times
/// that do not exist locally (DST gaps) drop the window.
pub fn sleep_windows(flight: &ResolvedFlight, sleep: &SleepSchedule) -> Vec<SleepWindow> {
    let tz = flight.origin_tz;
    let departure_date = flight.departure.with_timezone(&tz).date_naive();
    let resolve = |date: NaiveDate, time| {
        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    };

    (0..2)
        .filter_map(|offset| departure_date.checked_add_days(Days::new(offset)))
        .filter_map(|date| {
            let wake_date = if sleep.wakeup_time < sleep.bedtime {
                date.checked_add_days(Days::new(1))?
            } else {
                date
            };
            let bed = resolve(date, sleep.bedtime)?;
            let wake = resolve(wake_date, sleep.wakeup_time)?;
            (wake > bed).then(|| SleepWindow {
                bed_hours: hours_between(flight.departure, bed),
                wake_hours: hours_between(flight.departure, wake),
            })
        })
        .collect()
}
