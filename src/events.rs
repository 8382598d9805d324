use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};

use crate::error::LocationError;
use crate::position::Position;
use crate::state::GpsState;

/// Notification hooks fired synchronously by the tracker.
///
/// All methods default to no-ops so observers only implement what they use.
pub trait TrackerObserver {
    fn on_position_update(&mut self, _position: &Position, _state: &GpsState) {}
    fn on_error(&mut self, _error: LocationError) {}
    fn on_state_change(&mut self, _state: &GpsState) {}
    /// Total distance in kilometers, fired whenever it grows
    fn on_distance_update(&mut self, _total_km: f64) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TrackerObserver for NoopObserver {}

/// Owned copy of a tracker notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    PositionUpdate { position: Position, state: GpsState },
    Error { error: LocationError },
    StateChange { state: GpsState },
    DistanceUpdate { total_km: f64 },
}

/// Forwards notifications as [`TrackerEvent`] snapshots over a channel.
///
/// A disconnected receiver is not an error for the tracker, events are
/// dropped silently.
pub struct ChannelObserver {
    tx: Sender<TrackerEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<TrackerEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: TrackerEvent) {
        let _ = self.tx.send(event);
    }
}

impl TrackerObserver for ChannelObserver {
    fn on_position_update(&mut self, position: &Position, state: &GpsState) {
        self.send(TrackerEvent::PositionUpdate {
            position: position.clone(),
            state: state.clone(),
        });
    }

    fn on_error(&mut self, error: LocationError) {
        self.send(TrackerEvent::Error { error });
    }

    fn on_state_change(&mut self, state: &GpsState) {
        self.send(TrackerEvent::StateChange {
            state: state.clone(),
        });
    }

    fn on_distance_update(&mut self, total_km: f64) {
        self.send(TrackerEvent::DistanceUpdate { total_km });
    }
}

/// Readings pushed by a paired fitness device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceEvent {
    HeartRate { bpm: u16 },
    Battery { percent: u8 },
}

impl DeviceEvent {
    /// Decode a BLE Heart Rate Measurement characteristic value.
    ///
    /// Bit 0 of the flags byte selects an 8-bit or little-endian 16-bit value.
    pub fn from_heart_rate_measurement(value: &[u8]) -> Option<Self> {
        let flags = *value.first()?;
        let bpm = if flags & 0x01 == 0 {
            u16::from(*value.get(1)?)
        } else {
            u16::from_le_bytes([*value.get(1)?, *value.get(2)?])
        };
        Some(DeviceEvent::HeartRate { bpm })
    }

    /// Decode a BLE Battery Level characteristic value, clamped to 100
    pub fn from_battery_level(value: &[u8]) -> Option<Self> {
        value.first().map(|level| DeviceEvent::Battery {
            percent: (*level).min(100),
        })
    }
}

/// Latest reading of each device event kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub heart_rate_bpm: Option<u16>,
    pub battery_percent: Option<u8>,
}

impl DeviceSnapshot {
    pub fn apply(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::HeartRate { bpm } => self.heart_rate_bpm = Some(bpm),
            DeviceEvent::Battery { percent } => self.battery_percent = Some(percent),
        }
    }
}
