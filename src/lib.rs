//! Real-time GPS track acquisition for running sessions.
//!
//! Raw fixes from a [`LocationSource`] are checked for plausibility, smoothed
//! with a per-axis Kalman filter, gated on a minimum movement and integrated
//! into a haversine distance. [`GpsTracker`] owns the session and publishes
//! [`GpsState`] snapshots to a [`TrackerObserver`].

pub mod accumulator;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod filters;
pub mod geodesy;
pub mod position;
pub mod source;
pub mod state;
pub mod stats;
pub mod tracker;

pub use accumulator::{IngestOutcome, TrackAccumulator};
pub use config::TrackerConfig;
pub use error::{LocationError, TrackerError, TrackerResult};
pub use events::{ChannelObserver, DeviceEvent, DeviceSnapshot, TrackerEvent, TrackerObserver};
pub use export::{GpxTrack, TrackingExport};
pub use filters::{PositionSmoother, Rejection, RejectionCounts, ValidityFilter};
pub use geodesy::{haversine_km, haversine_m};
pub use position::Position;
pub use source::{LocationEvent, LocationSource, ReplaySource};
pub use state::{GpsState, SignalStrength};
pub use stats::{CalibrationProgress, GpsStats};
pub use tracker::GpsTracker;
