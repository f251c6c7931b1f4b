//! Outer optimization loop.
//!
//! One iteration runs simulate → integrate costate → perturb → controller
//! step and replaces the schedule's switching points with the controller's
//! output. The loop can be driven eagerly ([`run_to_convergence`],
//! [`OptimizationRun::run`]) or one iteration per external trigger
//! ([`OptimizationRun::step`] or the `Iterator` impl). Iterations are never
//! interrupted; cancelling simply stops scheduling further ones.
//!
//! # Stop Conditions
//!
//! | Reason | When |
//! |--------|------|
//! | Converged | Controller reports completion |
//! | CostStalled | More than two costs and the last two differ by < tolerance |
//! | IterationCap | `max_iterations` reached |
//! | Cancelled | Caller stopped the loop |
//! | InvalidInput | Sentinel schedule, nothing to optimize |

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OptimizerConfig;
use crate::initializer::ScheduleInitializer;
use crate::models::{Flight, SleepSchedule, StateTrajectory, SwitchingSchedule};

use super::adjoint::AdjointIntegrator;
use super::controller::ConvergenceController;
use super::perturbation::PerturbationCalculator;
use super::simulator::ForwardSimulator;

/// Why an optimization run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Switching times stopped moving (or none remain).
    Converged,
    /// Consecutive costs stopped improving.
    CostStalled,
    /// The iteration cap was reached.
    IterationCap,
    /// The caller stopped the loop.
    Cancelled,
    /// The schedule is the invalid-input sentinel.
    InvalidInput,
}

/// Summary of one completed iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Cost of the schedule the iteration started from.
    pub cost: f64,
    /// Switching points after the controller step.
    pub active_points: usize,
    /// Whether the controller reported convergence.
    pub is_complete: bool,
}

/// Final state of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Last completed schedule.
    pub schedule: SwitchingSchedule,
    /// Fresh simulation of `schedule`.
    pub trajectory: StateTrajectory,
    /// Cost of each iteration's starting schedule.
    pub cost_history: Vec<f64>,
    /// Completed iterations.
    pub iterations: usize,
    /// Whether the controller reported convergence.
    pub complete: bool,
    /// Why the run stopped.
    pub stop_reason: StopReason,
}

impl OptimizationResult {
    /// Last recorded cost.
    pub fn final_cost(&self) -> Option<f64> {
        self.cost_history.last().copied()
    }
}

/// An optimization in progress over one schedule.
///
/// # Example
///
/// ```
/// use jetshift::config::OptimizerConfig;
/// use jetshift::control::OptimizationRun;
/// use jetshift::initializer::ScheduleInitializer;
/// use jetshift::models::{Flight, SleepSchedule};
///
/// let flight = Flight::new("LHR", "PEK", "2024-01-01T08:00:00", "2024-01-02T00:00:00");
/// let schedule = ScheduleInitializer::new().initialize(
///     &flight,
///     "UTC",
///     "Asia/Shanghai",
///     &SleepSchedule::default(),
/// );
///
/// let mut run = OptimizationRun::new(schedule, &OptimizerConfig::default());
/// let first = run.step().unwrap();
/// assert_eq!(first.iteration, 1);
/// assert_eq!(run.cost_history().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct OptimizationRun {
    schedule: SwitchingSchedule,
    simulator: ForwardSimulator,
    adjoint: AdjointIntegrator,
    perturbation: PerturbationCalculator,
    controller: ConvergenceController,
    max_iterations: usize,
    cost_tolerance: f64,
    cost_history: Vec<f64>,
    history: Vec<SwitchingSchedule>,
    iterations: usize,
    complete: bool,
    stop_reason: Option<StopReason>,
}

impl OptimizationRun {
    /// Starts a run from `schedule`.
    pub fn new(schedule: SwitchingSchedule, config: &OptimizerConfig) -> Self {
        let stop_reason = schedule.is_sentinel().then_some(StopReason::InvalidInput);
        Self {
            history: vec![schedule.clone()],
            schedule,
            simulator: ForwardSimulator::from_config(config),
            adjoint: AdjointIntegrator::from_config(config),
            perturbation: PerturbationCalculator::from_config(config),
            controller: ConvergenceController::from_config(config),
            max_iterations: config.convergence.max_iterations,
            cost_tolerance: config.convergence.cost_tolerance,
            cost_history: Vec::new(),
            iterations: 0,
            complete: false,
            stop_reason,
        }
    }

    /// Current schedule.
    pub fn schedule(&self) -> &SwitchingSchedule {
        &self.schedule
    }

    /// Costs recorded so far.
    pub fn cost_history(&self) -> &[f64] {
        &self.cost_history
    }

    /// The starting schedule followed by each iteration's result.
    pub fn history(&self) -> &[SwitchingSchedule] {
        &self.history
    }

    /// Completed iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the controller has reported convergence.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Why the run stopped, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Whether no further iterations will run.
    pub fn is_finished(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Runs one iteration. Returns `None` once the run has stopped.
    pub fn step(&mut self) -> Option<IterationReport> {
        if self.stop_reason.is_some() {
            return None;
        }
        if self.iterations >= self.max_iterations {
            self.stop(StopReason::IterationCap);
            return None;
        }

        let simulation = self.simulator.simulate(&self.schedule);
        self.cost_history.push(simulation.cost);

        let costates = self
            .adjoint
            .integrate_costate(&self.schedule, &simulation.trajectory);
        let perturbations = self.perturbation.compute_perturbations(
            &self.schedule,
            &simulation.trajectory,
            &costates.at_boundaries,
        );
        let outcome = self
            .controller
            .step(&self.schedule, &perturbations, &self.cost_history);

        self.schedule.switching_points = outcome.new_points;
        self.history.push(self.schedule.clone());
        self.iterations += 1;
        self.complete = outcome.is_complete;

        debug!(
            iteration = self.iterations,
            cost = simulation.cost,
            active = outcome.new_active_count,
            complete = self.complete,
            "optimization iteration"
        );

        if self.complete {
            self.stop(StopReason::Converged);
        } else if self.cost_stalled() {
            self.stop(StopReason::CostStalled);
        } else if self.iterations >= self.max_iterations {
            self.stop(StopReason::IterationCap);
        }

        Some(IterationReport {
            iteration: self.iterations,
            cost: simulation.cost,
            active_points: outcome.new_active_count,
            is_complete: self.complete,
        })
    }

    /// Runs to a stop condition.
    pub fn run(self) -> OptimizationResult {
        self.run_until(|_| ControlFlow::Continue(()))
    }

    /// Runs until a stop condition or until `observe` breaks.
    ///
    /// `observe` sees every completed iteration; returning
    /// `ControlFlow::Break` cancels the run after that iteration.
    pub fn run_until<F>(mut self, mut observe: F) -> OptimizationResult
    where
        F: FnMut(&IterationReport) -> ControlFlow<()>,
    {
        while let Some(report) = self.step() {
            if observe(&report).is_break() {
                if self.stop_reason.is_none() {
                    self.stop(StopReason::Cancelled);
                }
                break;
            }
        }
        self.finish()
    }

    /// Ends the run and re-simulates the last schedule.
    ///
    /// A run finished before any stop condition is reported as cancelled.
    pub fn finish(mut self) -> OptimizationResult {
        if self.stop_reason.is_none() {
            self.stop(StopReason::Cancelled);
        }
        let trajectory = self.simulator.simulate(&self.schedule).trajectory;
        OptimizationResult {
            stop_reason: self.stop_reason.unwrap_or(StopReason::Cancelled),
            schedule: self.schedule,
            trajectory,
            cost_history: self.cost_history,
            iterations: self.iterations,
            complete: self.complete,
        }
    }

    fn cost_stalled(&self) -> bool {
        match self.cost_history.as_slice() {
            [.., previous, latest] if self.cost_history.len() > 2 => {
                (previous - latest).abs() < self.cost_tolerance
            }
            _ => false,
        }
    }

    fn stop(&mut self, reason: StopReason) {
        info!(
            ?reason,
            iterations = self.iterations,
            final_cost = self.cost_history.last().copied(),
            points = self.schedule.point_count(),
            "optimization stopped"
        );
        self.stop_reason = Some(reason);
    }
}

impl Iterator for OptimizationRun {
    type Item = IterationReport;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}

/// Initializes a schedule for `flight` and optimizes it to a stop condition.
pub fn run_to_convergence(
    flight: &Flight,
    origin_tz: &str,
    destination_tz: &str,
    sleep: &SleepSchedule,
    config: &OptimizerConfig,
) -> OptimizationResult {
    let schedule =
        ScheduleInitializer::from_config(config).initialize(flight, origin_tz, destination_tz, sleep);
    OptimizationRun::new(schedule, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    fn eastbound() -> Flight {
        Flight::new("LHR", "PEK", "2024-01-01T08:00:00", "2024-01-02T00:00:00")
    }

    fn initial_schedule() -> SwitchingSchedule {
        ScheduleInitializer::new().initialize(
            &eastbound(),
            "UTC",
            "Asia/Shanghai",
            &SleepSchedule::default(),
        )
    }

    #[test]
    fn test_convergence_scenario() {
        let config = OptimizerConfig::default();
        let result = run_to_convergence(
            &eastbound(),
            "UTC",
            "Asia/Shanghai",
            &SleepSchedule::default(),
            &config,
        );
        assert_eq!(result.schedule.direction, Direction::Eastbound);
        assert!(result.iterations >= 1);
        assert!(result.iterations <= config.convergence.max_iterations);
        assert_eq!(result.cost_history.len(), result.iterations);
        assert!(result.cost_history.iter().all(|c| c.is_finite() && *c >= 0.0));
        assert!(result.schedule.is_well_formed());
        assert!(result.trajectory.drive_values().all(|n| (0.0..=1.0).contains(&n)));
        // Drive saturates toward its equilibrium instead of collapsing to 0
        assert!(result.trajectory.drive_values().skip(1).all(|n| n > 0.99));
        assert_ne!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.complete, result.stop_reason == StopReason::Converged);
    }

    #[test]
    fn test_cost_follows_moved_switches() {
        // Near-saturated drive makes every sensitivity tiny, so shifts under
        // the default trust region land outside the window. A smaller one
        // keeps them inside and the schedule really moves.
        let config = OptimizerConfig::default().with_trust_region(1e-7);
        let result = run_to_convergence(
            &eastbound(),
            "UTC",
            "Asia/Shanghai",
            &SleepSchedule::default(),
            &config,
        );
        assert!(result.cost_history.len() >= 2);
        assert_ne!(result.cost_history[0], result.cost_history[1]);
        assert_ne!(result.schedule, initial_schedule());
    }

    #[test]
    fn test_invalid_input_stops_immediately() {
        let flight = Flight::new("LHR", "PEK", "garbage", "2024-01-02T00:00:00");
        let result = run_to_convergence(
            &flight,
            "UTC",
            "Asia/Shanghai",
            &SleepSchedule::default(),
            &OptimizerConfig::default(),
        );
        assert_eq!(result.stop_reason, StopReason::InvalidInput);
        assert_eq!(result.iterations, 0);
        assert!(result.cost_history.is_empty());
        assert!(result.schedule.is_sentinel());
        assert_eq!(result.trajectory.len(), 1);
    }

    #[test]
    fn test_iteration_cap() {
        let config = OptimizerConfig::default().with_max_iterations(1);
        let mut run = OptimizationRun::new(initial_schedule(), &config);
        assert!(run.step().is_some());
        assert!(run.step().is_none());
        assert!(run.is_finished());
        let result = run.finish();
        assert_eq!(result.iterations, 1);
        assert!(matches!(
            result.stop_reason,
            StopReason::Converged | StopReason::IterationCap
        ));
    }

    #[test]
    fn test_zero_cap_runs_nothing() {
        let config = OptimizerConfig::default().with_max_iterations(0);
        let result = OptimizationRun::new(initial_schedule(), &config).run();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.stop_reason, StopReason::IterationCap);
        assert_eq!(result.schedule, initial_schedule());
    }

    #[test]
    fn test_cancel_after_first_iteration() {
        let mut seen = 0;
        let result = OptimizationRun::new(initial_schedule(), &OptimizerConfig::default())
            .run_until(|_| {
                seen += 1;
                ControlFlow::Break(())
            });
        assert_eq!(seen, 1);
        assert_eq!(result.iterations, 1);
        // A first-iteration convergence wins over the cancellation
        assert!(matches!(
            result.stop_reason,
            StopReason::Cancelled | StopReason::Converged
        ));
    }

    #[test]
    fn test_incremental_matches_eager() {
        let config = OptimizerConfig::default();
        let eager = OptimizationRun::new(initial_schedule(), &config).run();

        let mut run = OptimizationRun::new(initial_schedule(), &config);
        let reports: Vec<IterationReport> = run.by_ref().collect();
        let incremental = run.finish();

        assert_eq!(reports.len(), eager.iterations);
        assert_eq!(incremental, eager);
        assert_eq!(
            reports.iter().map(|r| r.cost).collect::<Vec<_>>(),
            eager.cost_history
        );
    }

    #[test]
    fn test_history_tracks_every_iteration() {
        let mut run = OptimizationRun::new(initial_schedule(), &OptimizerConfig::default());
        while run.step().is_some() {}
        assert_eq!(run.history().len(), run.iterations() + 1);
        assert_eq!(run.history()[0], initial_schedule());
        assert_eq!(run.history().last(), Some(run.schedule()));
        assert!(run.history().iter().all(SwitchingSchedule::is_well_formed));
    }

    #[test]
    fn test_points_never_grow() {
        let mut run = OptimizationRun::new(initial_schedule(), &OptimizerConfig::default());
        let mut previous = run.schedule().point_count();
        for report in run.by_ref() {
            assert!(report.active_points <= previous);
            assert!(report.cost.is_finite());
            previous = report.active_points;
        }
        assert!(run.is_finished());
    }
}
