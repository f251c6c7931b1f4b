//! Optimizer configuration.
//!
//! Every tunable constant of the pipeline lives here, grouped per stage.
//! All groups implement `Default` with the reference values and are
//! serde-deserializable with `#[serde(default)]`, so a partial document
//! only overrides what it names.
//!
//! # Example
//!
//! ```
//! use jetshift::config::OptimizerConfig;
//!
//! let config = OptimizerConfig::default()
//!     .with_max_iterations(20)
//!     .with_time_tolerance(0.05);
//! assert_eq!(config.convergence.max_iterations, 20);
//! assert_eq!(config.simulation.max_samples, 200);
//! ```

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::circadian::ModelParams;
use crate::models::{Direction, Phase, SleepSchedule};

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Circadian model constants.
    pub model: ModelParams,
    /// Heuristic first-guess construction.
    pub initializer: InitializerConfig,
    /// Forward simulation.
    pub simulation: SimulationConfig,
    /// Backward costate integration.
    pub adjoint: AdjointConfig,
    /// Switching-time perturbation.
    pub perturbation: PerturbationConfig,
    /// Outer loop termination.
    pub convergence: ConvergenceConfig,
}

impl OptimizerConfig {
    /// Sets the model constants.
    pub fn with_model(mut self, model: ModelParams) -> Self {
        self.model = model;
        self
    }

    /// Sets the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.convergence.max_iterations = max_iterations;
        self
    }

    /// Sets the switching-time convergence tolerance (hours).
    pub fn with_time_tolerance(mut self, hours: f64) -> Self {
        self.convergence.time_tolerance_hours = hours;
        self
    }

    /// Sets the perturbation trust region TS.
    pub fn with_trust_region(mut self, trust_region: f64) -> Self {
        self.perturbation.trust_region = trust_region;
        self
    }

    /// Sets the initial drive seed.
    pub fn with_initial_drive(mut self, initial_drive: InitialDrive) -> Self {
        self.simulation.initial_drive = initial_drive;
        self
    }
}

/// Heuristic schedule construction constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitializerConfig {
    /// Phase intervals per hour of timezone difference.
    pub intervals_per_timezone_hour: f64,
    /// Shortest allowed phase (hours).
    pub min_interval_hours: f64,
    /// Phase duration factor for eastbound travel.
    pub eastbound_factor: f64,
    /// Phase duration factor for westbound travel.
    pub westbound_factor: f64,
    /// Length scale applied to light phases.
    pub light_phase_factor: f64,
    /// Length scale applied to dark phases.
    pub dark_phase_factor: f64,
    /// Slices shorter than this are merged into a neighbour (hours).
    pub min_sub_phase_hours: f64,
    /// How far the window extends past arrival (hours).
    pub horizon_extension_hours: f64,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self {
            intervals_per_timezone_hour: 1.5,
            min_interval_hours: 1.5,
            eastbound_factor: 1.15,
            westbound_factor: 0.85,
            light_phase_factor: 1.0,
            dark_phase_factor: 1.0,
            min_sub_phase_hours: 0.5,
            horizon_extension_hours: 24.0,
        }
    }
}

impl InitializerConfig {
    /// Phase duration scale for a travel direction.
    pub fn direction_factor(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Eastbound => self.eastbound_factor,
            Direction::Westbound => self.westbound_factor,
        }
    }

    /// Length scale for one phase of the walk.
    pub fn phase_factor(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Light => self.light_phase_factor,
            Phase::Dark => self.dark_phase_factor,
        }
    }
}

/// Forward simulation constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Upper bound on integration steps.
    pub max_samples: usize,
    /// Integration steps per flight hour (before the cap).
    pub samples_per_hour: f64,
    /// Upper bound on `|J|·h` for each midpoint sub-step.
    pub stability_limit: f64,
    /// Seed for the drive variable `n`.
    pub initial_drive: InitialDrive,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_samples: 200,
            samples_per_hour: 4.0,
            stability_limit: 0.5,
            initial_drive: InitialDrive::default(),
        }
    }
}

/// Initial drive seed selected from the sleep schedule.
///
/// A bedtime equal to `reference_bedtime` seeds `matching`, anything else
/// seeds `otherwise`. This coarse two-preset mapping is a known
/// simplification, kept configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialDrive {
    /// Bedtime that selects the `matching` preset.
    pub reference_bedtime: NaiveTime,
    /// Seed when the bedtime matches.
    pub matching: f64,
    /// Seed for every other bedtime.
    pub otherwise: f64,
}

impl Default for InitialDrive {
    fn default() -> Self {
        Self {
            reference_bedtime: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            matching: 0.4,
            otherwise: 0.6,
        }
    }
}

impl InitialDrive {
    /// Seed for `sleep`, clamped to `[0, 1]`.
    pub fn seed(&self, sleep: &SleepSchedule) -> f64 {
        let n = if sleep.bedtime == self.reference_bedtime {
            self.matching
        } else {
            self.otherwise
        };
        n.clamp(0.0, 1.0)
    }
}

/// Backward costate integration constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjointConfig {
    /// Integration steps across `[t0, tf]`.
    pub samples: usize,
    /// Include the running-cost gradient in the costate equation.
    pub running_cost_gradient: bool,
}

impl Default for AdjointConfig {
    fn default() -> Self {
        Self {
            samples: 100,
            running_cost_gradient: true,
        }
    }
}

/// Switching-time perturbation constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    /// Trust-region scale TS shared by all points.
    pub trust_region: f64,
    /// Control increment Δu.
    pub delta_u: f64,
    /// Floor for the sensitivity normalizer.
    pub epsilon: f64,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            trust_region: 0.1,
            delta_u: 0.1,
            epsilon: 1e-6,
        }
    }
}

/// Outer loop termination constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Converged when every point moves less than this (hours).
    pub time_tolerance_hours: f64,
    /// Stop when consecutive costs differ by less than this.
    pub cost_tolerance: f64,
    /// Iteration cap.
    pub max_iterations: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            time_tolerance_hours: 0.1,
            cost_tolerance: 1e-4,
            max_iterations: 50,
        }
    }
}
