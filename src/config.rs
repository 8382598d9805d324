use crate::error::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables for filtering, smoothing and buffering.
///
/// Defaults match the values the tracker has always shipped with. Any field
/// missing from a JSON config file keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Fixes with a reported accuracy above this (meters) are rejected
    pub max_accuracy_m: f64,
    /// Reported speed cap (m/s), 20 m/s = 72 km/h
    pub max_reported_speed_mps: f64,
    /// Speed implied by the jump from the last accepted fix (m/s), 25 m/s = 90 km/h
    pub max_implied_speed_mps: f64,
    /// Smoothed movement below this (meters) does not advance the track
    pub min_movement_m: f64,

    pub raw_buffer_capacity: usize,
    pub accepted_buffer_capacity: usize,

    /// Kalman process noise Q
    pub process_noise: f64,
    /// Kalman measurement noise R before the first measurement
    pub initial_measurement_noise: f64,
    /// Lower bound for R
    pub min_measurement_noise: f64,
    /// R = max(min_measurement_noise, accuracy * accuracy_noise_scale)
    pub accuracy_noise_scale: f64,

    /// Accuracy thresholds (meters) for excellent / good / fair signal
    pub excellent_accuracy_m: f64,
    pub good_accuracy_m: f64,
    pub fair_accuracy_m: f64,

    /// Delay before the single resubscribe after a timeout while tracking
    pub timeout_restart_delay_ms: u64,

    pub calibrated_accuracy_m: f64,
    pub calibrated_min_fixes: usize,
    pub usable_accuracy_m: f64,
    pub usable_min_fixes: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_accuracy_m: 50.0,
            max_reported_speed_mps: 20.0,
            max_implied_speed_mps: 25.0,
            min_movement_m: 3.0,
            raw_buffer_capacity: 200,
            accepted_buffer_capacity: 1000,
            process_noise: 1e-5,
            initial_measurement_noise: 1e-3,
            min_measurement_noise: 1e-5,
            accuracy_noise_scale: 1e-5,
            excellent_accuracy_m: 5.0,
            good_accuracy_m: 10.0,
            fair_accuracy_m: 20.0,
            timeout_restart_delay_ms: 2000,
            calibrated_accuracy_m: 10.0,
            calibrated_min_fixes: 5,
            usable_accuracy_m: 15.0,
            usable_min_fixes: 3,
        }
    }
}

impl TrackerConfig {
    /// Load from a JSON file and validate
    pub fn from_json_file(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> TrackerResult<Self> {
        let config: TrackerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout_restart_delay(&self) -> Duration {
        Duration::from_millis(self.timeout_restart_delay_ms)
    }

    /// Reject values that would make the pipeline meaningless
    pub fn validate(&self) -> TrackerResult<()> {
        let positive = [
            ("max_accuracy_m", self.max_accuracy_m),
            ("max_reported_speed_mps", self.max_reported_speed_mps),
            ("max_implied_speed_mps", self.max_implied_speed_mps),
            ("process_noise", self.process_noise),
            ("initial_measurement_noise", self.initial_measurement_noise),
            ("min_measurement_noise", self.min_measurement_noise),
            ("accuracy_noise_scale", self.accuracy_noise_scale),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.min_movement_m < 0.0 {
            return Err(TrackerError::InvalidConfig(
                "min_movement_m must not be negative".to_string(),
            ));
        }

        if self.raw_buffer_capacity == 0 || self.accepted_buffer_capacity == 0 {
            return Err(TrackerError::InvalidConfig(
                "buffer capacities must be at least 1".to_string(),
            ));
        }

        if !(self.excellent_accuracy_m <= self.good_accuracy_m
            && self.good_accuracy_m <= self.fair_accuracy_m)
        {
            return Err(TrackerError::InvalidConfig(
                "signal thresholds must be ordered excellent <= good <= fair".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_accuracy_m, 50.0);
        assert_eq!(config.min_movement_m, 3.0);
        assert_eq!(config.timeout_restart_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TrackerConfig::from_json_str(r#"{ "min_movement_m": 5.0 }"#).unwrap();
        assert_eq!(config.min_movement_m, 5.0);
        assert_eq!(config.max_implied_speed_mps, 25.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = TrackerConfig::from_json_str(r#"{ "raw_buffer_capacity": 0 }"#);
        assert!(matches!(err, Err(TrackerError::InvalidConfig(_))));

        let err = TrackerConfig::from_json_str(r#"{ "max_accuracy_m": -1.0 }"#);
        assert!(matches!(err, Err(TrackerError::InvalidConfig(_))));

        let err = TrackerConfig::from_json_str(r#"{ "good_accuracy_m": 30.0 }"#);
        assert!(matches!(err, Err(TrackerError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = TrackerConfig::from_json_str("{ not json");
        assert!(matches!(err, Err(TrackerError::Serialization(_))));
    }
}
