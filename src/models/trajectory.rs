//! State and costate trajectories.
//!
//! Trajectories are produced fresh by each optimization iteration and are
//! ordered chronologically. Samples carry both the absolute instant (for
//! display) and elapsed hours since `t0` (for the numerical stages).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Circadian state `(x, n)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircadianState {
    /// Oscillator phase (unbounded).
    pub x: f64,
    /// Photic drive, kept in `[0, 1]`.
    pub n: f64,
}

impl CircadianState {
    /// Creates a state.
    pub fn new(x: f64, n: f64) -> Self {
        Self { x, n }
    }
}

/// One state sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateSample {
    /// Sample instant.
    pub time: DateTime<Utc>,
    /// Hours since `t0`.
    pub elapsed_hours: f64,
    /// State at the sample.
    pub state: CircadianState,
}

/// Forward-simulated state samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTrajectory {
    /// Samples in chronological order.
    pub samples: Vec<StateSample>,
}

impl StateTrajectory {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the trajectory has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Hours covered by the trajectory (last sample's elapsed time).
    pub fn span_hours(&self) -> f64 {
        self.samples.last().map(|s| s.elapsed_hours).unwrap_or(0.0)
    }

    /// State at elapsed `hours`, located by proportional index.
    ///
    /// Index = `floor(hours / span * len)`, clamped to the sample range.
    /// Returns `None` only for an empty trajectory.
    pub fn state_at(&self, hours: f64) -> Option<CircadianState> {
        let last = self.samples.len().checked_sub(1)?;
        let span = self.span_hours();
        let index = if span > 0.0 && hours.is_finite() {
            let raw = (hours / span * self.samples.len() as f64).floor();
            if raw <= 0.0 {
                0
            } else {
                (raw as usize).min(last)
            }
        } else {
            0
        };
        Some(self.samples[index].state)
    }

    /// Iterates over the `n` values.
    pub fn drive_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.state.n)
    }
}

/// Costate `(λ1, λ2)` conjugate to `(x, n)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoState {
    /// Multiplier for `x`.
    pub lambda1: f64,
    /// Multiplier for `n`.
    pub lambda2: f64,
}

impl CoState {
    /// The terminal condition `{0, 0}`.
    pub const ZERO: CoState = CoState {
        lambda1: 0.0,
        lambda2: 0.0,
    };

    /// Creates a costate.
    pub fn new(lambda1: f64, lambda2: f64) -> Self {
        Self { lambda1, lambda2 }
    }

    /// Whether both components are finite.
    pub fn is_finite(&self) -> bool {
        self.lambda1.is_finite() && self.lambda2.is_finite()
    }
}

/// One costate sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoStateSample {
    /// Sample instant.
    pub time: DateTime<Utc>,
    /// Hours since `t0`.
    pub elapsed_hours: f64,
    /// Costate at the sample.
    pub costate: CoState,
}

/// Backward-integrated costate samples, stored chronologically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoStateTrajectory {
    /// Samples in chronological order (the last one is the terminal sample).
    pub samples: Vec<CoStateSample>,
}

impl CoStateTrajectory {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the trajectory has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The terminal (window end) costate.
    pub fn terminal(&self) -> Option<CoState> {
        self.samples.last().map(|s| s.costate)
    }
}

/// Key of a costate snapshot at a switching boundary.
///
/// Interior points are keyed by their 1-based ordinal; the final
/// boundary is keyed as `Terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BoundaryKey {
    /// Switching point `t{n}` (1-based).
    Switch(usize),
    /// The final boundary `tf`.
    Terminal,
}

impl BoundaryKey {
    /// 0-based point index for interior keys.
    pub fn point_index(&self) -> Option<usize> {
        match self {
            BoundaryKey::Switch(n) => n.checked_sub(1),
            BoundaryKey::Terminal => None,
        }
    }
}

impl fmt::Display for BoundaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryKey::Switch(n) => write!(f, "t{n}"),
            BoundaryKey::Terminal => write!(f, "tf"),
        }
    }
}

/// Costate snapshots at switching boundaries.
pub type BoundaryCoStates = BTreeMap<BoundaryKey, CoState>;
