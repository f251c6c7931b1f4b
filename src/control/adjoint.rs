//! Backward costate (adjoint) integration.
//!
//! Integrates `dλ/dt = −∇L − J(f)ᵀλ` from the terminal condition
//! `λ(tf) = {0, 0}` back to `t0`, where `L` is the running cost and `J`
//! the model Jacobian under the control active at each sample.
//!
//! # Algorithm
//!
//! 1. Split `[t0, tf]` into `samples` steps; visit sample times from `tf`
//!    down to `t0`.
//! 2. Record the current costate at each sample, and snapshot it for every
//!    switching boundary lying within half a step of the sample.
//! 3. Step back to the previous sample. Within one step `J` and `∇L` are
//!    held at the sample's values, and `J` is diagonal, so each component
//!    solves exactly:
//!
//!    ```text
//!    λ_k(t − h) = e^{J_kk·h}·λ_k(t) + g_k·(e^{J_kk·h} − 1) / J_kk
//!    ```
//!
//!    which reduces to `λ_k + g_k·h` when `J_kk = 0`. The update is stable
//!    for the stiff drive equation in a single step.
//! 4. Reverse the recorded samples into chronological order.
//!
//! # Reference
//! Bryson & Ho (1975), "Applied Optimal Control", Ch. 2.3

use tracing::trace;

use crate::circadian::{running_cost_gradient, ModelParams};
use crate::config::{AdjointConfig, OptimizerConfig};
use crate::models::time::add_hours;
use crate::models::{
    BoundaryCoStates, BoundaryKey, CircadianState, CoState, CoStateSample, CoStateTrajectory,
    PhaseTimeline, StateTrajectory, SwitchingSchedule,
};

/// Result of one backward integration.
#[derive(Debug, Clone, PartialEq)]
pub struct CostateResult {
    /// Costate samples over `[t0, tf]`, chronological.
    pub trajectory: CoStateTrajectory,
    /// Costate snapshots at switching boundaries.
    pub at_boundaries: BoundaryCoStates,
}

/// Integrates the costate equations backward over a schedule.
#[derive(Debug, Clone, Default)]
pub struct AdjointIntegrator {
    params: ModelParams,
    config: AdjointConfig,
}

impl AdjointIntegrator {
    /// Creates an integrator with default constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the model and adjoint sections of a pipeline config.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            params: config.model,
            config: config.adjoint.clone(),
        }
    }

    /// Sets the adjoint constants.
    pub fn with_config(mut self, config: AdjointConfig) -> Self {
        self.config = config;
        self
    }

    /// Integrates the costate from `tf` back to `t0`.
    ///
    /// The terminal sample is always `{0, 0}`. A zero-length window
    /// yields only that sample.
    pub fn integrate_costate(
        &self,
        schedule: &SwitchingSchedule,
        trajectory: &StateTrajectory,
    ) -> CostateResult {
        let span = schedule.window_hours().max(0.0);
        let steps = self.config.samples.max(1);
        let dt = span / steps as f64;
        let timeline = PhaseTimeline::from_schedule(schedule);
        let switching_hours = schedule.switching_hours();
        let last_point = switching_hours.len().checked_sub(1);

        let mut costate = CoState::ZERO;
        let mut samples = Vec::with_capacity(steps + 1);
        let mut at_boundaries = BoundaryCoStates::new();

        for i in (0..=steps).rev() {
            let hours = i as f64 * dt;
            samples.push(CoStateSample {
                time: add_hours(schedule.t0, hours),
                elapsed_hours: hours,
                costate,
            });

            for (j, &t) in switching_hours.iter().enumerate() {
                if (t - hours).abs() < dt / 2.0 {
                    let key = if Some(j) == last_point {
                        BoundaryKey::Terminal
                    } else {
                        BoundaryKey::Switch(j + 1)
                    };
                    at_boundaries.insert(key, costate);
                }
            }

            if i == 0 || dt == 0.0 {
                break;
            }

            let intensity = self.params.intensity(timeline.phase_at(hours));
            let state = trajectory
                .state_at(hours)
                .unwrap_or(CircadianState::new(0.0, 0.5));
            costate = self.step_back(costate, state, intensity, dt);
        }

        samples.reverse();
        trace!(
            samples = samples.len(),
            boundaries = at_boundaries.len(),
            "integrated costate"
        );
        CostateResult {
            trajectory: CoStateTrajectory { samples },
            at_boundaries,
        }
    }

    /// Moves the costate from `t` to `t − dt`.
    fn step_back(&self, costate: CoState, state: CircadianState, intensity: f64, dt: f64) -> CoState {
        let j = self.params.jacobian(intensity);
        let (g1, g2) = if self.config.running_cost_gradient {
            running_cost_gradient(state)
        } else {
            (0.0, 0.0)
        };
        CoState::new(
            exact_decay(costate.lambda1, g1, j[0][0], dt),
            exact_decay(costate.lambda2, g2, j[1][1], dt),
        )
    }
}

/// Solves `dλ/dt = −g − a·λ` backward over `h` with `a` and `g` constant.
fn exact_decay(lambda: f64, g: f64, a: f64, h: f64) -> f64 {
    if a == 0.0 {
        return lambda + g * h;
    }
    let growth = a * h;
    lambda * growth.exp() + g * growth.exp_m1() / a
}
