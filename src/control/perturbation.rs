//! Switching-time perturbations from boundary costates.
//!
//! # Algorithm
//!
//! For each interior switching point `j` (every point but the last):
//!
//! ```text
//! ΔI_j = I(phase after t_j) − I(phase before t_j)
//! s_j  = λ2(t_j) · r·α·ΔI_j·(1 − n(t_j))
//! σ    = TS / max(max_j |s_j|, ε)
//! Δt_j = −σ / (Δu · s_j)          (0 when non-finite)
//! ```
//!
//! `σ` is shared by all points so the largest sensitivity sets the scale.
//!
//! # Reference
//! Xu & Antsaklis (2004), "Optimal control of switched systems based on
//! parameterization of the switching instants"

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::circadian::ModelParams;
use crate::config::{OptimizerConfig, PerturbationConfig};
use crate::models::{
    BoundaryCoStates, BoundaryKey, CoState, StateTrajectory, SwitchingSchedule,
};

/// Proposed time shift for one switching point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPerturbation {
    /// 0-based index into the schedule's switching points.
    pub switching_point_id: usize,
    /// Shared step size σ.
    pub step_size: f64,
    /// Signed time shift (hours); always finite.
    pub time_adjustment_hours: f64,
}

/// Converts boundary costates into per-point time shifts.
#[derive(Debug, Clone, Default)]
pub struct PerturbationCalculator {
    params: ModelParams,
    config: PerturbationConfig,
}

impl PerturbationCalculator {
    /// Creates a calculator with default constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the model and perturbation sections of a pipeline config.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            params: config.model,
            config: config.perturbation.clone(),
        }
    }

    /// Sets the perturbation constants.
    pub fn with_config(mut self, config: PerturbationConfig) -> Self {
        self.config = config;
        self
    }

    /// One perturbation per interior point, in point order.
    pub fn compute_perturbations(
        &self,
        schedule: &SwitchingSchedule,
        trajectory: &StateTrajectory,
        costates: &BoundaryCoStates,
    ) -> Vec<ControlPerturbation> {
        let points = &schedule.switching_points;
        if points.len() < 2 {
            return Vec::new();
        }
        let hours = schedule.switching_hours();

        let sensitivities: Vec<f64> = points
            .windows(2)
            .enumerate()
            .map(|(j, pair)| {
                let lambda = costates
                    .get(&BoundaryKey::Switch(j + 1))
                    .copied()
                    .unwrap_or(CoState::ZERO);
                let n = trajectory.state_at(hours[j]).map(|s| s.n).unwrap_or(0.5);
                let jump = self.params.intensity_jump(pair[0].phase, pair[1].phase);
                lambda.lambda2 * self.params.drive_sensitivity(jump, n)
            })
            .collect();

        let largest = sensitivities
            .iter()
            .map(|s| s.abs())
            .filter(|s| s.is_finite())
            .fold(0.0_f64, f64::max);
        let step_size = self.config.trust_region / largest.max(self.config.epsilon);

        let perturbations: Vec<ControlPerturbation> = sensitivities
            .iter()
            .enumerate()
            .map(|(j, &s)| {
                let raw = -step_size / (self.config.delta_u * s);
                ControlPerturbation {
                    switching_point_id: j,
                    step_size,
                    time_adjustment_hours: if raw.is_finite() { raw } else { 0.0 },
                }
            })
            .collect();

        trace!(
            count = perturbations.len(),
            step_size,
            "computed perturbations"
        );
        perturbations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::adjoint::AdjointIntegrator;
    use crate::control::simulator::ForwardSimulator;
    use crate::models::time::add_hours;
    use crate::models::{CircadianState, Phase, SleepSchedule, StateSample, SwitchingPoint};
    use chrono::{TimeZone, Utc};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

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

    fn flat_trajectory(n: f64) -> StateTrajectory {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        StateTrajectory {
            samples: (0..=32)
                .map(|i| StateSample {
                    time: add_hours(t0, i as f64 * 0.25),
                    elapsed_hours: i as f64 * 0.25,
                    state: CircadianState::new(0.0, n),
                })
                .collect(),
        }
    }

    #[test]
    fn test_one_per_interior_point() {
        let s = schedule(&[(2.0, Phase::Light), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let costates = BoundaryCoStates::from([
            (BoundaryKey::Switch(1), CoState::new(0.0, 1.0)),
            (BoundaryKey::Switch(2), CoState::new(0.0, -1.0)),
        ]);
        let result = PerturbationCalculator::new().compute_perturbations(
            &s,
            &flat_trajectory(0.5),
            &costates,
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].switching_point_id, 0);
        assert_eq!(result[1].switching_point_id, 1);
    }

    #[test]
    fn test_shared_step_and_signs() {
        // Light→Dark at t1 (ΔI < 0), Dark→Light at t2 (ΔI > 0)
        let s = schedule(&[(2.0, Phase::Light), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let costates = BoundaryCoStates::from([
            (BoundaryKey::Switch(1), CoState::new(0.0, 1.0)),
            (BoundaryKey::Switch(2), CoState::new(0.0, 1.0)),
        ]);
        let result = PerturbationCalculator::new().compute_perturbations(
            &s,
            &flat_trajectory(0.5),
            &costates,
        );
        assert_eq!(result[0].step_size, result[1].step_size);
        // Equal |s| on both sides gives equal |Δt|
        let (a, b) = (
            result[0].time_adjustment_hours,
            result[1].time_adjustment_hours,
        );
        assert!((a.abs() - b.abs()).abs() < 1e-12);
        assert!(result[0].time_adjustment_hours > 0.0);
        assert!(result[1].time_adjustment_hours < 0.0);
    }

    #[test]
    fn test_same_phase_boundary_is_zero() {
        let s = schedule(&[(2.0, Phase::Dark), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let costates = BoundaryCoStates::from([
            (BoundaryKey::Switch(1), CoState::new(0.0, 1.0)),
            (BoundaryKey::Switch(2), CoState::new(0.0, 1.0)),
        ]);
        let result = PerturbationCalculator::new().compute_perturbations(
            &s,
            &flat_trajectory(0.5),
            &costates,
        );
        assert_eq!(result[0].time_adjustment_hours, 0.0);
        assert!(result[1].time_adjustment_hours != 0.0);
    }

    #[test]
    fn test_missing_costate_is_zero_shift() {
        let s = schedule(&[(2.0, Phase::Light), (4.0, Phase::Dark), (32.0, Phase::Light)]);
        let result = PerturbationCalculator::new().compute_perturbations(
            &s,
            &flat_trajectory(0.5),
            &BoundaryCoStates::new(),
        );
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|p| p.time_adjustment_hours == 0.0));
        // ε floor keeps σ finite
        assert!(result.iter().all(|p| p.step_size.is_finite()));
    }

    #[test]
    fn test_saturated_drive_is_zero_shift() {
        let s = schedule(&[(2.0, Phase::Light), (32.0, Phase::Dark)]);
        let costates = BoundaryCoStates::from([(BoundaryKey::Switch(1), CoState::new(0.0, 1.0))]);
        let result = PerturbationCalculator::new().compute_perturbations(
            &s,
            &flat_trajectory(1.0),
            &costates,
        );
        assert_eq!(result[0].time_adjustment_hours, 0.0);
    }

    #[test]
    fn test_too_few_points() {
        let calc = PerturbationCalculator::new();
        let traj = flat_trajectory(0.5);
        let costates = BoundaryCoStates::new();
        assert!(calc.compute_perturbations(&schedule(&[]), &traj, &costates).is_empty());
        assert!(calc
            .compute_perturbations(&schedule(&[(32.0, Phase::Dark)]), &traj, &costates)
            .is_empty());
    }

    #[test]
    fn test_pipeline_shifts_always_finite() {
        let mut rng = SmallRng::seed_from_u64(11);
        let sim = ForwardSimulator::new();
        let adjoint = AdjointIntegrator::new();
        let calc = PerturbationCalculator::new();
        for _ in 0..20 {
            let mut hours: Vec<f64> = (0..rng.random_range(1..10))
                .map(|_| rng.random_range(0.0..32.0))
                .collect();
            hours.sort_by(f64::total_cmp);
            hours.push(32.0);
            let points: Vec<(f64, Phase)> = hours
                .iter()
                .map(|&h| {
                    let phase = if rng.random_bool(0.5) {
                        Phase::Light
                    } else {
                        Phase::Dark
                    };
                    (h, phase)
                })
                .collect();
            let s = schedule(&points);
            let traj = sim.simulate(&s).trajectory;
            let costates = adjoint.integrate_costate(&s, &traj).at_boundaries;
            let result = calc.compute_perturbations(&s, &traj, &costates);
            assert_eq!(result.len(), points.len() - 1);
            assert!(result.iter().all(|p| p.time_adjustment_hours.is_finite()));
        }
    }
}
