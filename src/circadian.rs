//! Circadian model: parameters and the shared dynamics.
//!
//! Two coupled equations drive the oscillator phase `x` and the photic
//! drive `n` under light intensity `I`:
//!
//! ```text
//! dx/dt = ω·(x + B)·(1 + k₁·S(t))
//! dn/dt = r·(α·I·(1 − n) − β·n·(1 + k₂·S(t)))
//! ```
//!
//! `S(t)` is a sinusoidal entrainment term phase-locked to the bedtime
//! hour and `r` is the rate scale (per-minute rates expressed per hour).
//! The forward simulator integrates these equations; the adjoint
//! integrator uses their Jacobian and the perturbation stage uses
//! `∂f₂/∂I`.
//!
//! # Reference
//! Kronauer et al. (1999), "Quantifying human circadian pacemaker response
//! to brief, extended, and repeated light stimuli over the phototopic range"

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::models::{CircadianState, Phase};

/// Physiological constants of the circadian model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Angular frequency ω (rad/h), π/12 for a 24 h cycle.
    pub omega: f64,
    /// Photic activation rate α.
    pub alpha: f64,
    /// Photic decay rate β.
    pub beta: f64,
    /// Phase offset B.
    pub b: f64,
    /// Light intensity during dark phases (lux).
    pub dark_intensity: f64,
    /// Light intensity during light phases (lux).
    pub light_intensity: f64,
    /// Entrainment gain on the phase equation (k₁).
    pub phase_coupling: f64,
    /// Entrainment gain on the drive decay (k₂).
    pub drive_coupling: f64,
    /// Rate scale applied to the drive equation.
    pub rate_scale: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            omega: PI / 12.0,
            alpha: 0.05,
            beta: 0.01,
            b: 0.4,
            dark_intensity: 1000.0,
            light_intensity: 10000.0,
            phase_coupling: 0.2,
            drive_coupling: 0.15,
            rate_scale: 60.0,
        }
    }
}

impl ModelParams {
    /// Light intensity for a phase.
    #[inline]
    pub fn intensity(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Light => self.light_intensity,
            Phase::Dark => self.dark_intensity,
        }
    }

    /// Entrainment term `S(t)` at `elapsed_hours`.
    pub fn entrainment(&self, elapsed_hours: f64, bedtime_hour: u32) -> f64 {
        let step = PI / 12.0;
        ((elapsed_hours % 24.0) * step - f64::from(bedtime_hour) * step).sin()
    }

    /// Time derivatives `(dx/dt, dn/dt)` at `state`.
    pub fn derivatives(
        &self,
        state: CircadianState,
        intensity: f64,
        entrainment: f64,
    ) -> CircadianState {
        let dx = self.omega * (state.x + self.b) * (1.0 + self.phase_coupling * entrainment);
        let dn = self.rate_scale
            * (self.alpha * intensity * (1.0 - state.n)
                - self.beta * state.n * (1.0 + self.drive_coupling * entrainment));
        CircadianState::new(dx, dn)
    }

    /// Jacobian `∂f/∂(x, n)` under `intensity`, as `[[f1x, f1n], [f2x, f2n]]`.
    ///
    /// The entrainment modulation is dropped from the linearization.
    pub fn jacobian(&self, intensity: f64) -> [[f64; 2]; 2] {
        [
            [self.omega, 0.0],
            [0.0, -self.rate_scale * (self.alpha * intensity + self.beta)],
        ]
    }

    /// `∂f₂/∂I · ΔI` at drive level `n`.
    #[inline]
    pub fn drive_sensitivity(&self, delta_intensity: f64, n: f64) -> f64 {
        self.rate_scale * self.alpha * delta_intensity * (1.0 - n)
    }

    /// Intensity jump when switching from `before` to `after`.
    #[inline]
    pub fn intensity_jump(&self, before: Phase, after: Phase) -> f64 {
        self.intensity(after) - self.intensity(before)
    }
}

/// Running cost `(x − 0)² + (n − 0.5)²` of one state.
#[inline]
pub fn running_cost(state: CircadianState) -> f64 {
    state.x.powi(2) + (state.n - 0.5).powi(2)
}

/// Gradient of [`running_cost`] with respect to `(x, n)`.
#[inline]
pub fn running_cost_gradient(state: CircadianState) -> (f64, f64) {
    (2.0 * state.x, 2.0 * (state.n - 0.5))
}
