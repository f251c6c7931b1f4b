//! Forward simulation of circadian state over a switching schedule.
//!
//! # Algorithm
//!
//! 1. Seed `x = 0` and `n` from the sleep schedule.
//! 2. Resolve the switching points into `[start, end)` phase intervals.
//! 3. Take `N = min(max_samples, ceil(flight_hours · samples_per_hour))`
//!    steps of `dt = flight_hours / N`. At each step the active phase sets
//!    the light intensity and the state advances by explicit midpoint
//!    sub-steps, as many as keep `|J|·h` under the stability limit. `n` is
//!    clamped to `[0, 1]` after every sub-step.
//! 4. Cost is the mean running cost over all `N + 1` samples, replaced by
//!    zero when non-finite.
//!
//! The drive equation is stiff: under bright light `r·α·I` is about
//! 30 000/h, so a single midpoint step of a quarter hour overshoots and
//! pins `n` at 0.
//!
//! # Complexity
//! O(N · (p + m)) with the linear interval scan (p = switching points,
//! m = sub-steps per sample).

use crate::circadian::{running_cost, ModelParams};
use crate::config::{OptimizerConfig, SimulationConfig};
use crate::models::time::add_hours;
use crate::models::{
    CircadianState, PhaseTimeline, StateSample, StateTrajectory, SwitchingSchedule,
};

/// Result of one forward simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// State samples over `[t0, t0 + flight_hours]`.
    pub trajectory: StateTrajectory,
    /// Mean running cost (finite, ≥ 0).
    pub cost: f64,
}

/// Integrates the circadian model over a schedule.
#[derive(Debug, Clone, Default)]
pub struct ForwardSimulator {
    params: ModelParams,
    config: SimulationConfig,
}

impl ForwardSimulator {
    /// Creates a simulator with default constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the model and simulation sections of a pipeline config.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            params: config.model,
            config: config.simulation.clone(),
        }
    }

    /// Sets the model constants.
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Number of integration steps for a flight length.
    pub fn step_count(&self, flight_hours: f64) -> usize {
        if flight_hours.is_nan() || flight_hours <= 0.0 {
            return 0;
        }
        let wanted = (flight_hours * self.config.samples_per_hour).ceil() as usize;
        wanted.min(self.config.max_samples)
    }

    /// Simulates the schedule.
    ///
    /// Degenerate schedules (no points, zero duration) still produce a
    /// one-sample trajectory holding the seed state.
    pub fn simulate(&self, schedule: &SwitchingSchedule) -> SimulationResult {
        let flight_hours = schedule.flight_duration_hours;
        let steps = self.step_count(flight_hours);
        let dt = if steps > 0 {
            flight_hours / steps as f64
        } else {
            0.0
        };
        let timeline = PhaseTimeline::from_schedule(schedule);
        let bedtime_hour = schedule.sleep_schedule.bedtime_hour();

        let mut state = CircadianState::new(
            0.0,
            self.config.initial_drive.seed(&schedule.sleep_schedule),
        );
        let mut samples = Vec::with_capacity(steps + 1);

        for i in 0..=steps {
            let hours = i as f64 * dt;
            samples.push(StateSample {
                time: add_hours(schedule.t0, hours),
                elapsed_hours: hours,
                state,
            });
            if i == steps {
                break;
            }

            let intensity = self.params.intensity(timeline.phase_at(hours));
            let s = self.params.entrainment(hours, bedtime_hour);
            state = self.advance(state, intensity, s, dt);
        }

        let trajectory = StateTrajectory { samples };
        let cost = trajectory_cost(&trajectory);
        SimulationResult { trajectory, cost }
    }

    /// Number of midpoint sub-steps for one sample step under `intensity`.
    pub fn substep_count(&self, intensity: f64, dt: f64) -> usize {
        let j = self.params.jacobian(intensity);
        let stiffness = j[0][0].abs().max(j[1][1].abs());
        if self.config.stability_limit <= 0.0 || !(stiffness * dt).is_finite() {
            return 1;
        }
        ((stiffness * dt / self.config.stability_limit).ceil() as usize).max(1)
    }

    fn advance(
        &self,
        state: CircadianState,
        intensity: f64,
        entrainment: f64,
        dt: f64,
    ) -> CircadianState {
        let substeps = self.substep_count(intensity, dt);
        let h = dt / substeps as f64;
        (0..substeps).fold(state, |state, _| {
            self.midpoint_step(state, intensity, entrainment, h)
        })
    }

    fn midpoint_step(
        &self,
        state: CircadianState,
        intensity: f64,
        entrainment: f64,
        dt: f64,
    ) -> CircadianState {
        let k1 = self.params.derivatives(state, intensity, entrainment);
        let half = CircadianState::new(state.x + 0.5 * dt * k1.x, state.n + 0.5 * dt * k1.n);
        let k2 = self.params.derivatives(half, intensity, entrainment);
        CircadianState::new(
            state.x + dt * k2.x,
            clamp_unit(state.n + dt * k2.n),
        )
    }
}

/// Mean running cost over a trajectory; zero when empty or non-finite.
pub fn trajectory_cost(trajectory: &StateTrajectory) -> f64 {
    if trajectory.is_empty() {
        return 0.0;
    }
    let total: f64 = trajectory
        .samples
        .iter()
        .map(|s| running_cost(s.state))
        .sum();
    let mean = total / trajectory.len() as f64;
    if mean.is_finite() {
        mean
    } else {
        0.0
    }
}

/// Clamps to `[0, 1]`, mapping NaN to 0.
fn clamp_unit(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else {
        n.clamp(0.0, 1.0)
    }
}
