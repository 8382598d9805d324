use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::config::TrackerConfig;
use crate::position::Position;

/// Why a fix was dropped before smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Reported accuracy worse than the limit (meters)
    Accuracy(f64),
    /// Reported speed above a plausible running speed (m/s)
    Speed(f64),
    /// Latitude or longitude outside the valid range
    Coordinates { latitude: f64, longitude: f64 },
    /// Jump from the last accepted fix implies an impossible speed (m/s)
    Teleport { implied_speed: f64 },
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Rejection::Accuracy(acc) => write!(f, "accuracy {:.1} m too coarse", acc),
            Rejection::Speed(speed) => write!(f, "reported speed {:.1} m/s implausible", speed),
            Rejection::Coordinates {
                latitude,
                longitude,
            } => write!(f, "coordinates out of range ({}, {})", latitude, longitude),
            Rejection::Teleport { implied_speed } => {
                write!(f, "position jump implies {:.1} m/s", implied_speed)
            }
        }
    }
}

/// Per-reason rejection counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts {
    pub accuracy: u64,
    pub speed: u64,
    pub coordinates: u64,
    pub teleport: u64,
}

impl RejectionCounts {
    pub fn record(&mut self, rejection: &Rejection) {
        match rejection {
            Rejection::Accuracy(_) => self.accuracy += 1,
            Rejection::Speed(_) => self.speed += 1,
            Rejection::Coordinates { .. } => self.coordinates += 1,
            Rejection::Teleport { .. } => self.teleport += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.accuracy + self.speed + self.coordinates + self.teleport
    }
}

/// Plausibility checks run on every raw fix.
///
/// Checks run in a fixed order and the first failure is reported. The
/// teleport check compares against the last accepted (smoothed) fix and is
/// skipped when the timestamps do not move forward.
#[derive(Debug, Clone)]
pub struct ValidityFilter {
    max_accuracy_m: f64,
    max_reported_speed_mps: f64,
    max_implied_speed_mps: f64,
}

impl ValidityFilter {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            max_accuracy_m: config.max_accuracy_m,
            max_reported_speed_mps: config.max_reported_speed_mps,
            max_implied_speed_mps: config.max_implied_speed_mps,
        }
    }

    pub fn check(
        &self,
        candidate: &Position,
        last_accepted: Option<&Position>,
    ) -> Result<(), Rejection> {
        // NaN accuracy fails the bound as well
        if !(candidate.accuracy <= self.max_accuracy_m) {
            return Err(Rejection::Accuracy(candidate.accuracy));
        }

        if let Some(speed) = candidate.speed {
            if speed > self.max_reported_speed_mps {
                return Err(Rejection::Speed(speed));
            }
        }

        if !(candidate.latitude.abs() <= 90.0 && candidate.longitude.abs() <= 180.0) {
            return Err(Rejection::Coordinates {
                latitude: candidate.latitude,
                longitude: candidate.longitude,
            });
        }

        if let Some(last) = last_accepted {
            let elapsed = candidate.seconds_since(last);
            if elapsed > 0.0 {
                let implied_speed = last.distance_m(candidate) / elapsed;
                if implied_speed > self.max_implied_speed_mps {
                    return Err(Rejection::Teleport { implied_speed });
                }
            }
        }

        Ok(())
    }
}
