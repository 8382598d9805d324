use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::position::Position;

/// Coarse signal quality derived from reported accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl SignalStrength {
    pub fn from_accuracy(accuracy: f64, config: &TrackerConfig) -> Self {
        if accuracy <= config.excellent_accuracy_m {
            SignalStrength::Excellent
        } else if accuracy <= config.good_accuracy_m {
            SignalStrength::Good
        } else if accuracy <= config.fair_accuracy_m {
            SignalStrength::Fair
        } else {
            SignalStrength::Poor
        }
    }
}

/// Published session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsState {
    pub is_tracking: bool,
    pub accuracy: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub altitude: Option<f64>,
    /// Timestamp of the last accepted fix
    pub last_update: Option<f64>,
    /// Kilometers
    pub total_distance: f64,
    pub is_gps_enabled: bool,
    pub signal_strength: SignalStrength,
}

impl GpsState {
    pub fn new(is_gps_enabled: bool) -> Self {
        Self {
            is_tracking: false,
            accuracy: 0.0,
            speed: None,
            heading: None,
            altitude: None,
            last_update: None,
            total_distance: 0.0,
            is_gps_enabled,
            signal_strength: SignalStrength::Poor,
        }
    }

    /// Refresh the instantaneous fields from a fix
    pub fn apply_instantaneous(&mut self, position: &Position, config: &TrackerConfig) {
        self.accuracy = position.accuracy;
        self.speed = position.speed;
        self.heading = position.heading;
        self.signal_strength = SignalStrength::from_accuracy(position.accuracy, config);
    }

    /// Mirror an accepted fix
    pub fn apply_accepted(&mut self, position: &Position, config: &TrackerConfig) {
        self.apply_instantaneous(position, config);
        self.altitude = position.altitude;
        self.last_update = Some(position.timestamp);
    }
}

impl Default for GpsState {
    fn default() -> Self {
        Self::new(false)
    }
}
