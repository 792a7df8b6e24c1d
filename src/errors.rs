use thiserror::Error;

use crate::planner::{CommandKind, Phase};

/// Which data precondition a rate estimate could not satisfy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataShortfall {
    #[error("need at least {need} readings, have {have}")]
    TooFewReadings { have: usize, need: usize },
    #[error("no decline found in the readings")]
    NoDecline,
    #[error("decline at reading {decline_index} leaves too few readings after it (total {len})")]
    TooFewAfterDecline { decline_index: usize, len: usize },
    #[error("no reading after the decline to match target {target_ms}")]
    NothingAfterDecline { target_ms: i64 },
    #[error("nearest reading to target {target_ms} is {distance_ms} ms away (tolerance {tolerance_ms} ms)")]
    NoMatchNearTarget {
        target_ms: i64,
        distance_ms: i64,
        tolerance_ms: i64,
    },
}

/// Rate estimation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstimateError {
    #[error("Insufficient data: {0}")]
    InsufficientData(DataShortfall),
    #[error("Matched readings out of order: first at {first_ms}, second at {second_ms}")]
    OutOfOrderMatch { first_ms: i64, second_ms: i64 },
    #[error("Matched readings are {actual_gap_ms} ms apart, expected {expected_gap_ms} ms (tolerance {tolerance_ms} ms)")]
    IntervalMismatch {
        actual_gap_ms: i64,
        expected_gap_ms: i64,
        tolerance_ms: i64,
    },
    #[error("Negative decline: {decline}")]
    NegativeDecline { decline: i64 },
}

impl From<DataShortfall> for EstimateError {
    fn from(shortfall: DataShortfall) -> Self {
        EstimateError::InsufficientData(shortfall)
    }
}

/// Launch prediction failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictError {
    #[error("No readings to predict from")]
    NoReadings,
    #[error("Adversary rate is unset or not positive")]
    InvalidAdversaryRate,
    #[error("Ally rate is unset or not positive")]
    InvalidAllyRate,
    #[error("Durability already depleted (current {current})")]
    AlreadyDepleted { current: i64 },
    #[error("Destroyed by the adversary during round {round_index}")]
    DestroyedByOpponent { round_index: u32 },
    #[error("Launch window already passed (launch at {launch_time_ms}, now {now_ms})")]
    WindowAlreadyPassed { launch_time_ms: i64, now_ms: i64 },
    #[error("No resolution within {max_rounds} rounds")]
    TooManyRounds { max_rounds: u32 },
}

/// Snapshot storage failures
#[derive(Error, Debug, Clone)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Json(e.to_string())
    }
}

/// Main planner error type
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed or out-of-range command input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Command issued outside the phase that enables it
    #[error("{command} is not available in phase {phase}")]
    InvalidForPhase { command: CommandKind, phase: Phase },

    #[error(transparent)]
    Estimate(#[from] EstimateError),

    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type Result<T> = std::result::Result<T, Error>;
