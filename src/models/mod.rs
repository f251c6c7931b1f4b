//! Jet lag domain models.
//!
//! Provides the data types exchanged between the optimization stages and
//! the surrounding application (flight data source, sleep input, display).
//!
//! # Data Flow
//!
//! | Type | Produced by | Consumed by |
//! |------|-------------|-------------|
//! | Flight, SleepSchedule | External input | Initializer |
//! | SwitchingSchedule | Initializer, Controller | Every stage |
//! | StateTrajectory | Simulator | Adjoint, Perturbation, display |
//! | CoStateTrajectory | Adjoint | Display |
//! | BoundaryCoStates | Adjoint | Perturbation |

mod flight;
mod schedule;
mod sleep;
pub mod time;
mod timeline;
mod trajectory;

pub use flight::Flight;
pub use schedule::{Direction, Phase, SwitchingPoint, SwitchingSchedule};
pub use sleep::SleepSchedule;
pub use timeline::{PhaseInterval, PhaseTimeline};
pub use trajectory::{
    BoundaryCoStates, BoundaryKey, CircadianState, CoState, CoStateSample, CoStateTrajectory,
    StateSample, StateTrajectory,
};
