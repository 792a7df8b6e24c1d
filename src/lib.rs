#![deny(unreachable_pub)]

// Core modules
mod consts;
mod errors;

// Shared data types
pub mod types;

// Feature modules
pub mod planner;

// Re-exports
pub use consts::{
    DEFAULT_ROUND_DURATION_MINUTES, DEFAULT_TOLERANCE_MS, DEFAULT_TOTAL_CAPACITY,
    DEFAULT_TRAVEL_TIME_MINUTES, LAUNCH_GRACE_MS, MAX_PREDICTION_ROUNDS, MAX_SAVED_READINGS,
    MINUTE_MS, READINGS_FOR_ADVERSARY, READINGS_FOR_ALLY, READINGS_TO_START,
};
pub use errors::{DataShortfall, Error, EstimateError, PersistenceError, PredictError, Result};
pub use planner::{
    status_message, Clock, Command, CommandKind, LaunchPlan, Phase, Planner, SessionSnapshot,
    SessionState, SnapshotStore, SystemClock,
};
pub use types::*;
