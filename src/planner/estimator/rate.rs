//! Windowed per-round decline estimation.
//!
//! Two readings are sampled near fixed round offsets from T0 (the first
//! decline). Their value difference is the decline over one round.
//!
//! # Instantiations
//!
//! | Rate      | Offsets (rounds) | Min readings | Result                      |
//! |-----------|------------------|--------------|-----------------------------|
//! | Adversary | 1 → 2            | 3            | decline                     |
//! | Ally      | 3 → 4            | 5            | decline − adversary rate    |
//!
//! During the ally's attack window the adversary keeps hitting, so the observed
//! decline there is the sum of both contributions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decline::find_first_decline;
use crate::consts::{DEFAULT_TOLERANCE_MS, READINGS_FOR_ADVERSARY, READINGS_FOR_ALLY};
use crate::errors::{DataShortfall, EstimateError};
use crate::types::Reading;

/// Readings that must follow the decline for either estimate.
const MIN_READINGS_AFTER_DECLINE: usize = 2;

/// Pair of round offsets from T0 at which readings are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingWindow {
    pub offset_rounds_a: i64,
    pub offset_rounds_b: i64,
}

impl SamplingWindow {
    pub const ADVERSARY: SamplingWindow = SamplingWindow {
        offset_rounds_a: 1,
        offset_rounds_b: 2,
    };
    pub const ALLY: SamplingWindow = SamplingWindow {
        offset_rounds_a: 3,
        offset_rounds_b: 4,
    };
}

/// Configuration for the rate estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateEstimatorConfig {
    /// Maximum deviation from a sampling target, and from the expected gap
    pub tolerance_ms: i64,
    pub adversary_window: SamplingWindow,
    pub ally_window: SamplingWindow,
}

impl Default for RateEstimatorConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: DEFAULT_TOLERANCE_MS,
            adversary_window: SamplingWindow::ADVERSARY,
            ally_window: SamplingWindow::ALLY,
        }
    }
}

impl RateEstimatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tolerance_ms < 0 {
            return Err(format!("tolerance_ms must be >= 0, got {}", self.tolerance_ms));
        }
        for (name, w) in [("adversary", self.adversary_window), ("ally", self.ally_window)] {
            if w.offset_rounds_a < 0 || w.offset_rounds_b <= w.offset_rounds_a {
                return Err(format!(
                    "{name} window needs 0 <= offset_a < offset_b, got {} and {}",
                    w.offset_rounds_a, w.offset_rounds_b
                ));
            }
        }
        Ok(())
    }
}

/// The two matched readings and the decline between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSample {
    pub first: Reading,
    pub second: Reading,
    pub decline: i64,
}

/// A successful rate estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateEstimate {
    /// Damage per round attributed to the estimated side
    pub per_round: i64,
    /// Index of the first decline (T0) in the reading log
    pub decline_index: usize,
    pub sample: RateSample,
}

/// Reading closest in time to `target_ms`, if within `tolerance_ms`.
///
/// Ties go to the earlier reading.
fn nearest_reading(
    readings: &[Reading],
    target_ms: i64,
    tolerance_ms: i64,
) -> Result<Reading, DataShortfall> {
    let (reading, distance_ms) = readings
        .iter()
        .map(|r| (*r, r.timestamp_ms.saturating_sub(target_ms).saturating_abs()))
        .min_by_key(|&(_, d)| d)
        .ok_or(DataShortfall::NothingAfterDecline { target_ms })?;

    if distance_ms > tolerance_ms {
        return Err(DataShortfall::NoMatchNearTarget {
            target_ms,
            distance_ms,
            tolerance_ms,
        });
    }
    Ok(reading)
}

/// Estimate the decline over one sampling window.
///
/// # Arguments
/// * `readings_after_drop` - Sorted readings strictly after the decline point
/// * `t0_ms` - Timestamp of the decline point
/// * `round_ms` - Round duration in milliseconds
/// * `window` - Round offsets of the two sampling targets
/// * `tolerance_ms` - Allowed deviation for matches and for their spacing
pub fn estimate_rate(
    readings_after_drop: &[Reading],
    t0_ms: i64,
    round_ms: i64,
    window: SamplingWindow,
    tolerance_ms: i64,
) -> Result<RateSample, EstimateError> {
    let target_a = t0_ms.saturating_add(window.offset_rounds_a.saturating_mul(round_ms));
    let target_b = t0_ms.saturating_add(window.offset_rounds_b.saturating_mul(round_ms));

    let first = nearest_reading(readings_after_drop, target_a, tolerance_ms)?;
    let second = nearest_reading(readings_after_drop, target_b, tolerance_ms)?;
    debug!(
        target_a,
        target_b,
        first_ms = first.timestamp_ms,
        first_value = first.value,
        second_ms = second.timestamp_ms,
        second_value = second.value,
        "Matched sampling targets"
    );

    if first.timestamp_ms >= second.timestamp_ms {
        return Err(EstimateError::OutOfOrderMatch {
            first_ms: first.timestamp_ms,
            second_ms: second.timestamp_ms,
        });
    }

    let actual_gap_ms = second.timestamp_ms - first.timestamp_ms;
    let expected_gap_ms =
        (window.offset_rounds_b - window.offset_rounds_a).saturating_mul(round_ms);
    if actual_gap_ms.saturating_sub(expected_gap_ms).saturating_abs() > tolerance_ms {
        return Err(EstimateError::IntervalMismatch {
            actual_gap_ms,
            expected_gap_ms,
            tolerance_ms,
        });
    }

    let decline = first.value - second.value;
    if decline < 0 {
        return Err(EstimateError::NegativeDecline { decline });
    }

    Ok(RateSample {
        first,
        second,
        decline,
    })
}

/// Estimates the adversary and ally per-round rates from a reading log.
#[derive(Debug, Clone, Default)]
pub struct RateEstimator {
    config: RateEstimatorConfig,
}

impl RateEstimator {
    pub fn new(config: RateEstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RateEstimatorConfig {
        &self.config
    }

    /// Adversary damage per round, from readings ~1 and ~2 rounds after T0.
    pub fn estimate_adversary(
        &self,
        readings: &[Reading],
        round_ms: i64,
    ) -> Result<RateEstimate, EstimateError> {
        let decline_index = locate_decline(readings, READINGS_FOR_ADVERSARY)?;
        let sample = self.sample(readings, decline_index, round_ms, self.config.adversary_window)?;

        Ok(RateEstimate {
            per_round: sample.decline,
            decline_index,
            sample,
        })
    }

    /// Ally damage per round, from readings ~3 and ~4 rounds after T0, net of
    /// the adversary's contribution over the same round.
    pub fn estimate_ally(
        &self,
        readings: &[Reading],
        round_ms: i64,
        adversary_per_round: i64,
    ) -> Result<RateEstimate, EstimateError> {
        let decline_index = locate_decline(readings, READINGS_FOR_ALLY)?;
        let sample = self.sample(readings, decline_index, round_ms, self.config.ally_window)?;

        let ally = sample.decline - adversary_per_round;
        debug!(
            total_decline = sample.decline,
            adversary_per_round, ally, "Ally share of combined decline"
        );
        if ally < 0 {
            return Err(EstimateError::NegativeDecline { decline: ally });
        }

        Ok(RateEstimate {
            per_round: ally,
            decline_index,
            sample,
        })
    }

    fn sample(
        &self,
        readings: &[Reading],
        decline_index: usize,
        round_ms: i64,
        window: SamplingWindow,
    ) -> Result<RateSample, EstimateError> {
        let t0_ms = readings[decline_index].timestamp_ms;
        estimate_rate(
            &readings[decline_index + 1..],
            t0_ms,
            round_ms,
            window,
            self.config.tolerance_ms,
        )
    }
}

/// Find T0 and check that enough readings exist around it.
fn locate_decline(readings: &[Reading], min_readings: usize) -> Result<usize, EstimateError> {
    if readings.len() < min_readings {
        return Err(DataShortfall::TooFewReadings {
            have: readings.len(),
            need: min_readings,
        }
        .into());
    }

    let decline_index = find_first_decline(readings).ok_or(DataShortfall::NoDecline)?;
    if decline_index + MIN_READINGS_AFTER_DECLINE >= readings.len() {
        return Err(DataShortfall::TooFewAfterDecline {
            decline_index,
            len: readings.len(),
        }
        .into());
    }
    debug!(decline_index, t0_ms = readings[decline_index].timestamp_ms, "First decline located");
    Ok(decline_index)
}
