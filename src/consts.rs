/// One minute in milliseconds.
pub const MINUTE_MS: i64 = 60 * 1000;

/// Maximum distance between a sampling target and the reading matched to it,
/// and between the observed and expected gap of two matched readings.
pub const DEFAULT_TOLERANCE_MS: i64 = 2 * MINUTE_MS;

/// Upper bound on the number of rounds the predictor will simulate.
pub const MAX_PREDICTION_ROUNDS: u32 = 10_000;

/// How far in the past a computed launch time may lie and still be reported.
pub const LAUNCH_GRACE_MS: i64 = MINUTE_MS;

/// Number of most recent readings kept in a persisted snapshot.
pub const MAX_SAVED_READINGS: usize = 50;

/// Readings needed before the phase leaves `Idle`.
pub const READINGS_TO_START: usize = 1;
/// Readings needed before the adversary rate can be estimated.
pub const READINGS_FOR_ADVERSARY: usize = 3;
/// Readings needed before the ally rate can be estimated.
pub const READINGS_FOR_ALLY: usize = 5;

pub const DEFAULT_TOTAL_CAPACITY: i64 = 400_000;
pub const DEFAULT_ROUND_DURATION_MINUTES: i64 = 5;
pub const DEFAULT_TRAVEL_TIME_MINUTES: i64 = 5;
