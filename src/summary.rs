//! Exposure schedule summary metrics.
//!
//! Computes the figures a traveller-facing view shows for an optimized
//! schedule and its cost history.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Light hours | Total length of light intervals |
//! | Dark hours | Total length of dark intervals |
//! | Phase count | Non-empty light/dark intervals |
//! | Switch count | Interior switching points (all but the terminal one) |
//! | Initial / final cost | First and last entries of the cost history |
//! | Cost reduction | `(initial − final) / initial`, 0 when initial is 0 |

use serde::{Deserialize, Serialize};

use crate::control::OptimizationResult;
use crate::models::{Phase, PhaseTimeline, SwitchingSchedule};

/// Schedule indicators.
///
/// All durations are in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    /// Hours of light exposure.
    pub light_hours: f64,
    /// Hours of darkness.
    pub dark_hours: f64,
    /// Non-empty phase intervals.
    pub phase_count: usize,
    /// Interior switches.
    pub switch_count: usize,
    /// Cost before the first update.
    pub initial_cost: Option<f64>,
    /// Cost at the last iteration.
    pub final_cost: Option<f64>,
    /// Relative cost reduction (0.0..1.0 when the cost improved).
    pub cost_reduction: f64,
}

impl ScheduleSummary {
    /// Computes the summary of a schedule and its cost history.
    ///
    /// # Arguments
    /// * `schedule` - The schedule to describe.
    /// * `cost_history` - Per-iteration costs (may be empty).
    pub fn calculate(schedule: &SwitchingSchedule, cost_history: &[f64]) -> Self {
        let timeline = PhaseTimeline::from_schedule(schedule);
        let initial_cost = cost_history.first().copied();
        let final_cost = cost_history.last().copied();

        let cost_reduction = match (initial_cost, final_cost) {
            (Some(initial), Some(last)) if initial > 0.0 => (initial - last) / initial,
            _ => 0.0,
        };

        Self {
            light_hours: timeline.total_hours(Phase::Light),
            dark_hours: timeline.total_hours(Phase::Dark),
            phase_count: timeline.phase_count(),
            switch_count: schedule.point_count().saturating_sub(1),
            initial_cost,
            final_cost,
            cost_reduction,
        }
    }

    /// Summary of a finished optimization.
    pub fn from_result(result: &OptimizationResult) -> Self {
        Self::calculate(&result.schedule, &result.cost_history)
    }

    /// Whether the optimization lowered the cost.
    pub fn improved(&self) -> bool {
        self.cost_reduction > 0.0
    }
}
