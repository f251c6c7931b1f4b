//! Light/dark exposure scheduling for jet lag recovery.
//!
//! Builds a heuristic switching schedule for a flight, then refines the
//! switching times against a two-state circadian model using forward
//! simulation, backward costate integration and first-order switching-time
//! sensitivities.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Flight`, `SleepSchedule`,
//!   `SwitchingSchedule`, `PhaseTimeline`, state and costate trajectories
//! - **`validation`**: Flight instant and timezone resolution
//! - **`circadian`**: Model constants and dynamics
//! - **`initializer`**: Heuristic first-guess schedule
//! - **`control`**: Simulator, adjoint integrator, perturbations, controller
//!   and the outer loop
//! - **`summary`**: Schedule metrics for display
//! - **`config`**: Tunable constants for every stage
//!
//! # Example
//!
//! ```
//! use jetshift::{run_to_convergence, Flight, OptimizerConfig, ScheduleSummary, SleepSchedule};
//!
//! let flight = Flight::new("LHR", "PEK", "2024-01-01T08:00:00", "2024-01-02T00:00:00");
//! let result = run_to_convergence(
//!     &flight,
//!     "UTC",
//!     "Asia/Shanghai",
//!     &SleepSchedule::default(),
//!     &OptimizerConfig::default(),
//! );
//!
//! let summary = ScheduleSummary::from_result(&result);
//! assert!(summary.light_hours > 0.0);
//! assert!(result.iterations <= 50);
//! ```
//!
//! # References
//!
//! - Kronauer et al. (1999), "Quantifying human circadian pacemaker response
//!   to brief, extended, and repeated light stimuli over the phototopic range"
//! - Bryson & Ho (1975), "Applied Optimal Control"
//! - Egerstedt, Wardi & Axelsson (2006), "Transition-time optimization for
//!   switched-mode dynamical systems"

pub mod circadian;
pub mod config;
pub mod control;
pub mod initializer;
pub mod models;
pub mod summary;
pub mod validation;

pub use config::OptimizerConfig;
pub use control::{run_to_convergence, OptimizationResult, OptimizationRun, StopReason};
pub use initializer::ScheduleInitializer;
pub use models::{Flight, Phase, SleepSchedule, SwitchingSchedule};
pub use summary::ScheduleSummary;
pub use validation::{ValidationError, ValidationErrorKind};
