//! Timing configuration shared by the estimators and the predictor.

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_ROUND_DURATION_MINUTES, DEFAULT_TOTAL_CAPACITY, DEFAULT_TRAVEL_TIME_MINUTES,
    MINUTE_MS,
};

/// Round and travel timing for one siege.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Full durability of the target. Context only; no formula uses it.
    pub total_capacity: i64,
    /// Length of one adversary round in minutes
    pub round_duration_minutes: i64,
    /// Time for the ally's action to travel and land, in minutes
    pub travel_time_minutes: i64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            total_capacity: DEFAULT_TOTAL_CAPACITY,
            round_duration_minutes: DEFAULT_ROUND_DURATION_MINUTES,
            travel_time_minutes: DEFAULT_TRAVEL_TIME_MINUTES,
        }
    }
}

impl TimingConfig {
    pub fn new(total_capacity: i64, round_duration_minutes: i64, travel_time_minutes: i64) -> Self {
        Self {
            total_capacity,
            round_duration_minutes,
            travel_time_minutes,
        }
    }

    /// Check the value ranges. Returns a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.total_capacity <= 0 {
            return Err(format!(
                "total_capacity must be > 0, got {}",
                self.total_capacity
            ));
        }
        if self.round_duration_minutes <= 0 {
            return Err(format!(
                "round_duration_minutes must be > 0, got {}",
                self.round_duration_minutes
            ));
        }
        if self.travel_time_minutes < 0 {
            return Err(format!(
                "travel_time_minutes must be >= 0, got {}",
                self.travel_time_minutes
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn round_duration_ms(&self) -> i64 {
        self.round_duration_minutes.saturating_mul(MINUTE_MS)
    }

    #[inline]
    pub fn travel_time_ms(&self) -> i64 {
        self.travel_time_minutes.saturating_mul(MINUTE_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TimingConfig::default();
        assert_eq!(config.total_capacity, 400_000);
        assert_eq!(config.round_duration_ms(), 5 * 60_000);
        assert_eq!(config.travel_time_ms(), 5 * 60_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(TimingConfig::new(0, 5, 5).validate().is_err());
        assert!(TimingConfig::new(100, 0, 5).validate().is_err());
        assert!(TimingConfig::new(100, 5, -1).validate().is_err());
        // Zero travel time is allowed
        assert!(TimingConfig::new(100, 5, 0).validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TimingConfig = toml::from_str("round_duration_minutes = 10").unwrap();
        assert_eq!(config.round_duration_minutes, 10);
        assert_eq!(config.travel_time_minutes, 5);
        assert_eq!(config.total_capacity, 400_000);
    }
}
