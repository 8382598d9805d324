use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::position::Position;

/// One-dimensional Kalman estimator for a single coordinate axis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarKalman {
    /// Process noise Q (fixed)
    pub q: f64,
    /// Measurement noise R, recomputed per measurement
    pub r: f64,
    /// Error covariance P
    pub p: f64,
    /// Current estimate X
    pub x: f64,
    /// Last gain K
    pub k: f64,
}

impl ScalarKalman {
    pub fn new(process_noise: f64, initial_measurement_noise: f64) -> Self {
        Self {
            q: process_noise,
            r: initial_measurement_noise,
            p: 1.0,
            x: 0.0,
            k: 0.0,
        }
    }

    /// Predict/update step, returns the new estimate
    pub fn update(&mut self, measurement: f64, measurement_noise: f64) -> f64 {
        self.r = measurement_noise;
        self.p += self.q;
        self.k = self.p / (self.p + self.r);
        self.x += self.k * (measurement - self.x);
        self.p *= 1.0 - self.k;
        self.x
    }
}

/// Smooths latitude and longitude with two independent scalar filters.
///
/// The first fix after construction or [`PositionSmoother::reset`] seeds both
/// estimates and is returned untouched. Every later fix is blended in with a
/// measurement noise that grows with the reported accuracy.
#[derive(Clone, Debug)]
pub struct PositionSmoother {
    lat: ScalarKalman,
    lon: ScalarKalman,
    initialized: bool,
    process_noise: f64,
    initial_measurement_noise: f64,
    min_measurement_noise: f64,
    accuracy_noise_scale: f64,
}

impl PositionSmoother {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            lat: ScalarKalman::new(config.process_noise, config.initial_measurement_noise),
            lon: ScalarKalman::new(config.process_noise, config.initial_measurement_noise),
            initialized: false,
            process_noise: config.process_noise,
            initial_measurement_noise: config.initial_measurement_noise,
            min_measurement_noise: config.min_measurement_noise,
            accuracy_noise_scale: config.accuracy_noise_scale,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn latitude_filter(&self) -> &ScalarKalman {
        &self.lat
    }

    pub fn longitude_filter(&self) -> &ScalarKalman {
        &self.lon
    }

    fn measurement_noise(&self, accuracy: f64) -> f64 {
        (accuracy * self.accuracy_noise_scale).max(self.min_measurement_noise)
    }

    /// Return a copy of `position` with smoothed coordinates
    pub fn smooth(&mut self, position: &Position) -> Position {
        if !self.initialized {
            self.lat.x = position.latitude;
            self.lon.x = position.longitude;
            self.initialized = true;
            return position.clone();
        }

        let r = self.measurement_noise(position.accuracy);
        let latitude = self.lat.update(position.latitude, r);
        let longitude = self.lon.update(position.longitude, r);
        position.with_coordinates(latitude, longitude)
    }

    /// Back to the constructed state, both axes together
    pub fn reset(&mut self) {
        self.lat = ScalarKalman::new(self.process_noise, self.initial_measurement_noise);
        self.lon = ScalarKalman::new(self.process_noise, self.initial_measurement_noise);
        self.initialized = false;
    }
}
