//! Convergence controller: applies or prunes perturbations.
//!
//! # Algorithm
//!
//! - **Retreat** (the latest cost exceeds the previous one): drop the point
//!   with the largest-magnitude proposed shift, leave the rest untouched.
//! - **Advance** (otherwise): shift every point, keeping a shifted time only
//!   when it stays strictly inside `(t0, tf)`; stable-sort; drop points
//!   outside `[t0, tf]`.
//!
//! Complete when no points remain or every position moved less than the
//! time tolerance. The controller has no iteration cap; the runner owns it.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{ConvergenceConfig, OptimizerConfig};
use crate::models::time::{add_hours, hours_between};
use crate::models::{SwitchingPoint, SwitchingSchedule};

use super::perturbation::ControlPerturbation;

/// Result of one controller step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Updated switching points, chronological.
    pub new_points: Vec<SwitchingPoint>,
    /// Iterations completed so far (the cost history length).
    pub new_iteration_count: usize,
    /// Whether the schedule has converged.
    pub is_complete: bool,
    /// Remaining switching points.
    pub new_active_count: usize,
}

/// Decides how a schedule moves between iterations.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceController {
    config: ConvergenceConfig,
}

impl ConvergenceController {
    /// Creates a controller with default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the convergence section of a pipeline config.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            config: config.convergence.clone(),
        }
    }

    /// Sets the switching-time tolerance (hours).
    pub fn with_time_tolerance(mut self, hours: f64) -> Self {
        self.config.time_tolerance_hours = hours;
        self
    }

    /// Computes the next set of switching points.
    pub fn step(
        &self,
        schedule: &SwitchingSchedule,
        perturbations: &[ControlPerturbation],
        cost_history: &[f64],
    ) -> StepOutcome {
        let new_points = if is_diverging(cost_history) {
            self.retreat(schedule, perturbations)
        } else {
            self.advance(schedule, perturbations)
        };

        let max_shift = schedule
            .switching_points
            .iter()
            .zip(&new_points)
            .map(|(old, new)| hours_between(old.time, new.time).abs())
            .fold(0.0_f64, f64::max);
        let is_complete =
            new_points.is_empty() || max_shift < self.config.time_tolerance_hours;

        trace!(max_shift, is_complete, active = new_points.len(), "controller step");
        StepOutcome {
            new_iteration_count: cost_history.len(),
            new_active_count: new_points.len(),
            is_complete,
            new_points,
        }
    }

    fn retreat(
        &self,
        schedule: &SwitchingSchedule,
        perturbations: &[ControlPerturbation],
    ) -> Vec<SwitchingPoint> {
        let mut points = schedule.switching_points.clone();
        let largest = perturbations.iter().reduce(|best, p| {
            if p.time_adjustment_hours.abs() > best.time_adjustment_hours.abs() {
                p
            } else {
                best
            }
        });
        if let Some(p) = largest {
            if p.switching_point_id < points.len() {
                trace!(point = p.switching_point_id, "cost rose, pruning point");
                points.remove(p.switching_point_id);
            }
        }
        points
    }

    fn advance(
        &self,
        schedule: &SwitchingSchedule,
        perturbations: &[ControlPerturbation],
    ) -> Vec<SwitchingPoint> {
        let mut points = schedule.switching_points.clone();
        for p in perturbations {
            let Some(point) = points.get_mut(p.switching_point_id) else {
                continue;
            };
            let moved = add_hours(point.time, p.time_adjustment_hours);
            if moved > schedule.t0 && moved < schedule.tf {
                point.time = moved;
            }
        }
        points.sort_by_key(|p| p.time);
        points.retain(|p| p.time >= schedule.t0 && p.time <= schedule.tf);
        points
    }
}

/// Whether the latest cost is worse than the one before it.
fn is_diverging(cost_history: &[f64]) -> bool {
    match cost_history {
        [.., previous, latest] => latest > previous,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Phase, SleepSchedule};
    use chrono::{TimeZone, Utc};

    fn schedule(points: &[(f64, Phase)]) -> SwitchingSchedule {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let tf = add_hours(t0, 32.0);
        SwitchingSchedule::new(t0, tf, 8.0, 8.0, SleepSchedule::default()).with_points(
            points
                .iter()
                .map(|&(h, phase)| SwitchingPoint::new(add_hours(t0, h), phase))
                .collect(),
        )
    }

    fn shift(id: usize, hours: f64) -> ControlPerturbation {
        ControlPerturbation {
            switching_point_id: id,
            step_size: 1.0,
            time_adjustment_hours: hours,
        }
    }

    fn hours(s: &SwitchingSchedule, points: &[SwitchingPoint]) -> Vec<f64> {
        points.iter().map(|p| hours_between(s.t0, p.time)).collect()
    }

    #[test]
    fn test_advance_applies_shifts() {
        let s = schedule(&[(2.0, Phase::Light), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let out = ConvergenceController::new().step(&s, &[shift(0, 0.5), shift(1, -0.25)], &[1.0]);
        let h = hours(&s, &out.new_points);
        assert!((h[0] - 2.5).abs() < 1e-9);
        assert!((h[1] - 3.75).abs() < 1e-9);
        assert!((h[2] - 32.0).abs() < 1e-9);
        assert_eq!(out.new_active_count, 3);
        assert_eq!(out.new_iteration_count, 1);
        assert!(!out.is_complete);
    }

    #[test]
    fn test_advance_rejects_moves_outside_window() {
        let s = schedule(&[(2.0, Phase::Light), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let out = ConvergenceController::new().step(&s, &[shift(0, -5.0), shift(1, 40.0)], &[1.0]);
        let h = hours(&s, &out.new_points);
        assert_eq!(h, vec![2.0, 4.0, 32.0]);
        assert!(out.is_complete);
    }

    #[test]
    fn test_advance_resorts_and_carries_phase() {
        let s = schedule(&[(2.0, Phase::Light), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let out = ConvergenceController::new().step(&s, &[shift(0, 3.0)], &[1.0]);
        let h = hours(&s, &out.new_points);
        assert!((h[0] - 4.0).abs() < 1e-9);
        assert!((h[1] - 5.0).abs() < 1e-9);
        assert_eq!(out.new_points[0].phase, Phase::Dark);
        assert_eq!(out.new_points[1].phase, Phase::Light);
        assert!(out.new_points.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_retreat_drops_largest_shift() {
        let s = schedule(&[(2.0, Phase::Light), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let out = ConvergenceController::new().step(
            &s,
            &[shift(0, 0.2), shift(1, -0.9)],
            &[1.0, 0.8, 0.9],
        );
        let h = hours(&s, &out.new_points);
        assert_eq!(h, vec![2.0, 32.0]);
        assert_eq!(out.new_active_count, 2);
        assert_eq!(out.new_iteration_count, 3);
    }

    #[test]
    fn test_retreat_without_perturbations_is_noop() {
        let s = schedule(&[(2.0, Phase::Light), (32.0, Phase::Dark)]);
        let out = ConvergenceController::new().step(&s, &[], &[0.5, 0.6]);
        assert_eq!(out.new_points, s.switching_points);
        assert!(out.is_complete);
    }

    #[test]
    fn test_equal_costs_advance() {
        let s = schedule(&[(2.0, Phase::Light), (32.0, Phase::Dark)]);
        let out = ConvergenceController::new().step(&s, &[shift(0, 1.0)], &[0.5, 0.5]);
        assert_eq!(out.new_points.len(), 2);
    }

    #[test]
    fn test_empty_schedule_is_complete() {
        let s = schedule(&[]);
        let out = ConvergenceController::new().step(&s, &[], &[0.1]);
        assert!(out.is_complete);
        assert_eq!(out.new_active_count, 0);
    }

    #[test]
    fn test_small_shifts_converge() {
        let s = schedule(&[(2.0, Phase::Light), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let out = ConvergenceController::new().step(&s, &[shift(0, 0.05), shift(1, -0.05)], &[1.0]);
        assert!(out.is_complete);
        let out = ConvergenceController::new()
            .with_time_tolerance(0.01)
            .step(&s, &[shift(0, 0.05)], &[1.0]);
        assert!(!out.is_complete);
    }
}
