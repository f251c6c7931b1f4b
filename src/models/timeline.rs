//! Phase timeline: switching points resolved into control intervals.
//!
//! # Time Model
//! All times are elapsed hours relative to the schedule's `t0`.
//!
//! # Resolution
//! Intervals are half-open `[start, end)`. A time is resolved to the phase
//! of the first interval containing it; times outside every interval
//! (before `t0`, at or after the last point) resolve to [`Phase::Dark`].

use serde::{Deserialize, Serialize};

use super::schedule::{Phase, SwitchingSchedule};

/// A control interval `[start, end)` with its phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseInterval {
    /// Interval start (hours, inclusive).
    pub start_hours: f64,
    /// Interval end (hours, exclusive).
    pub end_hours: f64,
    /// Phase active over the interval.
    pub phase: Phase,
}

impl PhaseInterval {
    /// Creates a new interval.
    pub fn new(start_hours: f64, end_hours: f64, phase: Phase) -> Self {
        Self {
            start_hours,
            end_hours,
            phase,
        }
    }

    /// Interval length (hours). Zero for empty or inverted intervals.
    #[inline]
    pub fn duration_hours(&self) -> f64 {
        (self.end_hours - self.start_hours).max(0.0)
    }

    /// Whether `hours` falls within this interval.
    #[inline]
    pub fn contains(&self, hours: f64) -> bool {
        hours >= self.start_hours && hours < self.end_hours
    }
}

/// Ordered control intervals of one schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimeline {
    intervals: Vec<PhaseInterval>,
}

impl PhaseTimeline {
    /// Resolves a schedule's points into intervals.
    ///
    /// Interval `j` runs from the previous point (or `t0`) to point `j`
    /// and carries point `j`'s phase.
    pub fn from_schedule(schedule: &SwitchingSchedule) -> Self {
        let mut prev = 0.0;
        let intervals = schedule
            .switching_hours()
            .into_iter()
            .zip(&schedule.switching_points)
            .map(|(end, point)| {
                let interval = PhaseInterval::new(prev, end, point.phase);
                prev = end;
                interval
            })
            .collect();
        Self { intervals }
    }

    /// All intervals, in point order.
    pub fn intervals(&self) -> &[PhaseInterval] {
        &self.intervals
    }

    /// Phase active at `hours` (linear scan, first match wins).
    pub fn phase_at(&self, hours: f64) -> Phase {
        self.intervals
            .iter()
            .find(|i| i.contains(hours))
            .map(|i| i.phase)
            .unwrap_or(Phase::Dark)
    }

    /// Total hours spent in `phase` across all intervals.
    pub fn total_hours(&self, phase: Phase) -> f64 {
        self.intervals
            .iter()
            .filter(|i| i.phase == phase)
            .map(PhaseInterval::duration_hours)
            .sum()
    }

    /// Number of non-empty intervals.
    pub fn phase_count(&self) -> usize {
        self.intervals
            .iter()
            .filter(|i| i.duration_hours() > 0.0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::time::add_hours;
    use crate::models::{SleepSchedule, SwitchingPoint};
    use chrono::{TimeZone, Utc};

    fn timeline() -> PhaseTimeline {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let tf = add_hours(t0, 10.0);
        let schedule = SwitchingSchedule::new(t0, tf, 8.0, 8.0, SleepSchedule::default())
            .with_points(vec![
                SwitchingPoint::new(add_hours(t0, 2.0), Phase::Light),
                SwitchingPoint::new(add_hours(t0, 5.0), Phase::Dark),
                SwitchingPoint::new(tf, Phase::Light),
            ]);
        PhaseTimeline::from_schedule(&schedule)
    }

    #[test]
    fn test_interval_contains() {
        let i = PhaseInterval::new(1.0, 2.0, Phase::Light);
        assert!(i.contains(1.0));
        assert!(i.contains(1.999));
        assert!(!i.contains(2.0)); // exclusive end
        assert!(!i.contains(0.5));
        assert!((i.duration_hours() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_phase_at() {
        let t = timeline();
        assert_eq!(t.phase_at(0.0), Phase::Light);
        assert_eq!(t.phase_at(2.0), Phase::Dark);
        assert_eq!(t.phase_at(4.99), Phase::Dark);
        assert_eq!(t.phase_at(5.0), Phase::Light);
        assert_eq!(t.phase_at(10.0), Phase::Dark); // past the last point
        assert_eq!(t.phase_at(-1.0), Phase::Dark);
    }

    #[test]
    fn test_totals() {
        let t = timeline();
        assert!((t.total_hours(Phase::Light) - 7.0).abs() < 1e-12);
        assert!((t.total_hours(Phase::Dark) - 3.0).abs() < 1e-12);
        assert_eq!(t.phase_count(), 3);
    }

    #[test]
    fn test_empty_schedule_is_dark() {
        let t = PhaseTimeline::default();
        assert_eq!(t.phase_at(3.0), Phase::Dark);
        assert_eq!(t.phase_count(), 0);
    }

    #[test]
    fn test_zero_length_interval_skipped() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let schedule = SwitchingSchedule::new(t0, add_hours(t0, 4.0), 0.0, 4.0, SleepSchedule::default())
            .with_points(vec![
                SwitchingPoint::new(add_hours(t0, 2.0), Phase::Light),
                SwitchingPoint::new(add_hours(t0, 2.0), Phase::Dark),
                SwitchingPoint::new(add_hours(t0, 4.0), Phase::Dark),
            ]);
        let t = PhaseTimeline::from_schedule(&schedule);
        assert_eq!(t.phase_at(2.0), Phase::Dark);
        assert_eq!(t.phase_count(), 2);
    }
}
