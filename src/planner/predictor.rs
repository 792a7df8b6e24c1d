//! Launch-time prediction by forward simulation.
//!
//! After `n` more adversary rounds the durability is `current − n·adversary`.
//! The smallest `n` at which the ally's hit finishes what remains is the
//! round to target. The ally must launch `travel` before that round boundary:
//!
//! ```text
//! launch = now + n·round − travel
//! land   = launch + travel
//! ```
//!
//! If the adversary brings durability to zero first, there is no window.

use tracing::debug;

use super::clock::format_clock_time;
use crate::consts::{LAUNCH_GRACE_MS, MAX_PREDICTION_ROUNDS};
use crate::errors::PredictError;

/// Configuration for the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorConfig {
    /// Safety bound on simulated rounds
    pub max_rounds: u32,
    /// How far in the past a launch time may be and still count as usable
    pub launch_grace_ms: i64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            max_rounds: MAX_PREDICTION_ROUNDS,
            launch_grace_ms: LAUNCH_GRACE_MS,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.launch_grace_ms < 0 {
            return Err(format!(
                "launch_grace_ms must be >= 0, got {}",
                self.launch_grace_ms
            ));
        }
        Ok(())
    }
}

/// Inputs to one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionInput {
    /// Latest observed durability
    pub current_value: i64,
    pub adversary_per_round: Option<i64>,
    pub ally_per_round: Option<i64>,
    pub round_duration_ms: i64,
    pub travel_time_ms: i64,
}

/// A usable launch recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Adversary rounds to let pass before the ally's hit lands
    pub rounds_to_wait: u32,
    pub launch_time_ms: i64,
    pub landing_time_ms: i64,
}

impl LaunchPlan {
    pub fn message(&self) -> String {
        format!(
            "Launch at {} (lands at {}) after {} more adversary rounds",
            format_clock_time(self.launch_time_ms),
            format_clock_time(self.landing_time_ms),
            self.rounds_to_wait
        )
    }
}

/// Durability left after `n` adversary rounds.
#[inline]
pub fn remaining_after(current_value: i64, adversary_per_round: i64, n: u32) -> i64 {
    current_value.saturating_sub(adversary_per_round.saturating_mul(i64::from(n)))
}

/// Finds the latest safe launch time for the finishing blow.
#[derive(Debug, Clone, Default)]
pub struct Predictor {
    config: PredictorConfig,
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Predict the launch time for `input` as seen at `now_ms`.
    pub fn predict(&self, input: &PredictionInput, now_ms: i64) -> Result<LaunchPlan, PredictError> {
        let adversary = match input.adversary_per_round {
            Some(rate) if rate > 0 => rate,
            _ => return Err(PredictError::InvalidAdversaryRate),
        };
        let ally = match input.ally_per_round {
            Some(rate) if rate > 0 => rate,
            _ => return Err(PredictError::InvalidAllyRate),
        };
        if input.current_value <= 0 {
            return Err(PredictError::AlreadyDepleted {
                current: input.current_value,
            });
        }

        for n in 0..=self.config.max_rounds {
            let remaining = remaining_after(input.current_value, adversary, n);

            // n >= 1 here: current_value > 0 rules out n = 0. The target
            // falls during round n + 1, before the ally's hit could land in it.
            if remaining <= 0 {
                debug!(round = n + 1, "Adversary finishes the target first");
                return Err(PredictError::DestroyedByOpponent { round_index: n + 1 });
            }

            if remaining - ally <= 0 {
                let wait_ms = i64::from(n).saturating_mul(input.round_duration_ms);
                let launch_time_ms = now_ms
                    .saturating_add(wait_ms)
                    .saturating_sub(input.travel_time_ms);
                debug!(rounds_to_wait = n, remaining, launch_time_ms, "Finishing round found");

                if launch_time_ms < now_ms - self.config.launch_grace_ms {
                    return Err(PredictError::WindowAlreadyPassed {
                        launch_time_ms,
                        now_ms,
                    });
                }
                return Ok(LaunchPlan {
                    rounds_to_wait: n,
                    launch_time_ms,
                    landing_time_ms: launch_time_ms.saturating_add(input.travel_time_ms),
                });
            }
        }

        Err(PredictError::TooManyRounds {
            max_rounds: self.config.max_rounds,
        })
    }
}
