use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::accumulator::TrackAccumulator;
use crate::config::TrackerConfig;
use crate::error::TrackerResult;
use crate::events::DeviceSnapshot;
use crate::position::Position;
use crate::state::GpsState;
use crate::stats::GpsStats;

/// Point-in-time diagnostic dump of a tracking session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingExport {
    pub exported_at: String,
    pub positions: Vec<Position>,
    pub raw_positions: Vec<Position>,
    pub stats: GpsStats,
    pub state: GpsState,
    pub config: TrackerConfig,
    pub devices: DeviceSnapshot,
}

impl TrackingExport {
    pub fn from_tracker(accumulator: &TrackAccumulator, devices: DeviceSnapshot) -> Self {
        Self {
            exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            positions: accumulator.positions().iter().cloned().collect(),
            raw_positions: accumulator.raw_positions().iter().cloned().collect(),
            stats: accumulator.stats(),
            state: accumulator.state().clone(),
            config: accumulator.config().clone(),
            devices,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> TrackerResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Accepted track as GPX
    pub fn to_gpx(&self, name: &str) -> GpxTrack {
        create_gpx_track(name, &self.positions)
    }
}

/// GPX track for mapping applications
#[derive(Debug, Clone, Serialize)]
pub struct GpxTrack {
    pub name: String,
    pub track_points: Vec<GpxPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<String>,
}

impl GpxTrack {
    /// Generate GPX 1.1 document
    pub fn to_gpx_xml(&self) -> String {
        let name = escape_xml(&self.name);
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<gpx version=\"1.1\" creator=\"gps_tracker_rs\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n");
        xml.push_str(&format!("  <metadata>\n    <name>{}</name>\n  </metadata>\n", name));
        xml.push_str("  <trk>\n");
        xml.push_str(&format!("    <name>{}</name>\n", name));
        xml.push_str("    <trkseg>\n");

        for point in &self.track_points {
            xml.push_str(&format!(
                "      <trkpt lat=\"{:.7}\" lon=\"{:.7}\">\n",
                point.lat, point.lon
            ));
            if let Some(ele) = point.ele {
                xml.push_str(&format!("        <ele>{:.1}</ele>\n", ele));
            }
            if let Some(time) = &point.time {
                xml.push_str(&format!("        <time>{}</time>\n", time));
            }
            xml.push_str("      </trkpt>\n");
        }

        xml.push_str("    </trkseg>\n");
        xml.push_str("  </trk>\n");
        xml.push_str("</gpx>\n");
        xml
    }

    pub fn write(&self, path: impl AsRef<Path>) -> TrackerResult<()> {
        fs::write(path, self.to_gpx_xml())?;
        Ok(())
    }
}

pub fn create_gpx_track(name: &str, positions: &[Position]) -> GpxTrack {
    let track_points = positions
        .iter()
        .map(|p| GpxPoint {
            lat: p.latitude,
            lon: p.longitude,
            ele: p.altitude,
            time: timestamp_to_rfc3339(p.timestamp),
        })
        .collect();

    GpxTrack {
        name: name.to_string(),
        track_points,
    }
}

fn timestamp_to_rfc3339(timestamp: f64) -> Option<String> {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
