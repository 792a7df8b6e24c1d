//! Siege timing planner.
//!
//! Turns a log of sparse durability readings into a launch recommendation
//! for the ally's finishing hit:
//! - **Estimator**: finds the first drop and measures per-round damage rates
//! - **Predictor**: simulates adversary rounds to find the finishing round
//! - **Phase**: state machine gating which command is legal
//! - **Planner**: owns the session and executes commands against it
//! - **Checkpoint**: persists config and recent readings across restarts
//!
//! ```text
//! readings ──► estimator ──► rates ──► predictor ──► launch plan
//!                  ▲                        ▲
//!                  └──── phase gating ──────┘
//! ```

mod checkpoint;
mod clock;
mod estimator;
mod phase;
mod predictor;
mod session;
mod status;


pub use checkpoint::{SnapshotFile, SnapshotMetadata, SnapshotStore, SNAPSHOT_VERSION};
pub use clock::{format_clock_time, Clock, ManualClock, SystemClock};
pub use estimator::{
    estimate_rate, find_first_decline, RateEstimate, RateEstimator, RateEstimatorConfig,
    RateSample, SamplingWindow,
};
pub use phase::{transition, CommandKind, Phase, PhaseEvent};
pub use predictor::{remaining_after, LaunchPlan, PredictionInput, Predictor, PredictorConfig};
pub use session::{Command, Planner, SessionSnapshot, SessionState};
pub use status::status_message;
