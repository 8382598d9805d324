use serde::{Deserialize, Serialize};

use crate::geodesy;

/// A single fix from the location source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported horizontal uncertainty (meters)
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub altitude_accuracy: Option<f64>,
    /// Degrees clockwise from true north
    #[serde(default)]
    pub heading: Option<f64>,
    /// m/s
    #[serde(default)]
    pub speed: Option<f64>,
    /// Capture time, Unix seconds
    pub timestamp: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
            timestamp,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Same fix with the horizontal coordinates replaced
    pub fn with_coordinates(&self, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..self.clone()
        }
    }

    pub fn distance_km(&self, other: &Position) -> f64 {
        geodesy::haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    pub fn distance_m(&self, other: &Position) -> f64 {
        geodesy::haversine_m(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Seconds from `earlier` to this fix, negative when out of order
    pub fn seconds_since(&self, earlier: &Position) -> f64 {
        self.timestamp - earlier.timestamp
    }
}
