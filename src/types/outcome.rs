//! Estimated rates and the latest launch recommendation.

use serde::{Deserialize, Serialize};

/// Per-round damage rates, each set only by a successful estimate.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rates {
    pub adversary_per_round: Option<i64>,
    pub ally_per_round: Option<i64>,
}

impl Rates {
    pub fn is_complete(&self) -> bool {
        self.adversary_per_round.is_some() && self.ally_per_round.is_some()
    }
}

/// Result of the most recent prediction, replaced wholesale on every run.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PredictionResult {
    /// Recommended launch timestamp (ms since epoch), if any
    pub launch_time_ms: Option<i64>,
    pub message: String,
}

impl Default for PredictionResult {
    fn default() -> Self {
        Self {
            launch_time_ms: None,
            message: "No prediction yet".to_string(),
        }
    }
}

impl PredictionResult {
    pub fn is_success(&self) -> bool {
        self.launch_time_ms.is_some()
    }
}
