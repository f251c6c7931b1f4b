//! Switching-time optimization of the light/dark schedule.
//!
//! Each stage is a pure function of a [`SwitchingSchedule`] snapshot;
//! only the runner threads the latest schedule from one iteration into
//! the next.
//!
//! # Pipeline
//!
//! | Stage | Type | Output |
//! |-------|------|--------|
//! | Forward simulation | [`ForwardSimulator`] | State trajectory and cost |
//! | Costate integration | [`AdjointIntegrator`] | Costate trajectory and boundary snapshots |
//! | Sensitivities | [`PerturbationCalculator`] | Per-point time shifts |
//! | Update | [`ConvergenceController`] | New points and completion flag |
//! | Outer loop | [`OptimizationRun`] | Final schedule and cost history |
//!
//! # Reference
//! Egerstedt, Wardi & Axelsson (2006), "Transition-time optimization for
//! switched-mode dynamical systems"
//!
//! [`SwitchingSchedule`]: crate::models::SwitchingSchedule

pub mod adjoint;
pub mod controller;
pub mod perturbation;
pub mod runner;
pub mod simulator;

pub use adjoint::{AdjointIntegrator, CostateResult};
pub use controller::{ConvergenceController, StepOutcome};
pub use perturbation::{ControlPerturbation, PerturbationCalculator};
pub use runner::{
    run_to_convergence, IterationReport, OptimizationResult, OptimizationRun, StopReason,
};
pub use simulator::{trajectory_cost, ForwardSimulator, SimulationResult};
