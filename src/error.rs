use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a location source
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Timed out waiting for a position")]
    Timeout,

    #[error("Location services not supported on this device")]
    Unsupported,
}

impl LocationError {
    /// Message suitable for showing to the runner, says what to enable and where
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "Location permission was denied. Allow location access for this app in your browser or system settings, then try again."
            }
            LocationError::PositionUnavailable => {
                "Your position is unavailable. Check that GPS / location services are switched on in the device settings."
            }
            LocationError::Timeout => {
                "Getting your location took too long. Move to an open area with a clear view of the sky and try again."
            }
            LocationError::Unsupported => {
                "This device does not provide location services, so GPS tracking cannot be used."
            }
        }
    }

    /// Timeouts are the only condition the tracker recovers from by itself
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LocationError::Timeout)
    }
}

/// Tracker error types
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("GPS is not enabled")]
    GpsDisabled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Actionable text for the user, falls back to the display form
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::Location(e) => e.user_message().to_string(),
            TrackerError::GpsDisabled => {
                "GPS is turned off. Enable location services in the device settings to start tracking."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_actionable() {
        for err in [
            LocationError::PermissionDenied,
            LocationError::PositionUnavailable,
            LocationError::Timeout,
            LocationError::Unsupported,
        ] {
            assert!(!err.user_message().is_empty());
            assert_ne!(err.user_message(), err.to_string());
        }
        assert!(LocationError::PermissionDenied
            .user_message()
            .contains("settings"));
    }

    #[test]
    fn test_only_timeout_is_recoverable() {
        assert!(LocationError::Timeout.is_recoverable());
        assert!(!LocationError::PermissionDenied.is_recoverable());
        assert!(!LocationError::PositionUnavailable.is_recoverable());
    }

    #[test]
    fn test_tracker_error_wraps_location_error() {
        let err: TrackerError = LocationError::PositionUnavailable.into();
        assert!(err.to_string().contains("Position unavailable"));
        assert!(err.user_message().contains("GPS"));
    }
}
