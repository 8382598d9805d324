use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::filters::RejectionCounts;
use crate::position::Position;

/// Summary over the accepted and raw buffers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsStats {
    pub average_accuracy: f64,
    pub max_speed: f64,
    pub average_speed: f64,
    /// Meters climbed between consecutive accepted fixes
    pub total_elevation_gain: f64,
    pub valid_positions: usize,
    /// Raw fixes that never made it into the accepted buffer
    pub filtered_positions: usize,
    pub rejections: RejectionCounts,
}

pub fn average_accuracy<'a>(positions: impl IntoIterator<Item = &'a Position>) -> f64 {
    let (sum, count) = positions
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), p| (sum + p.accuracy, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Highest reported speed, 0 when none reported
pub fn max_speed<'a>(positions: impl IntoIterator<Item = &'a Position>) -> f64 {
    positions
        .into_iter()
        .filter_map(|p| p.speed)
        .fold(None, |max: Option<f64>, s| Some(max.map_or(s, |m| m.max(s))))
        .unwrap_or(0.0)
}

/// Mean of the positive reported speeds
pub fn average_speed<'a>(positions: impl IntoIterator<Item = &'a Position>) -> f64 {
    let speeds: Vec<f64> = positions
        .into_iter()
        .filter_map(|p| p.speed)
        .filter(|s| *s > 0.0)
        .collect();
    if speeds.is_empty() {
        return 0.0;
    }
    speeds.iter().sum::<f64>() / speeds.len() as f64
}

/// Sum of climbs between consecutive fixes that both carry an altitude
pub fn elevation_gain<'a>(positions: impl IntoIterator<Item = &'a Position>) -> f64 {
    let mut gain = 0.0;
    let mut previous: Option<Option<f64>> = None;
    for p in positions {
        if let Some(Some(prev)) = previous {
            if let Some(curr) = p.altitude {
                if curr > prev {
                    gain += curr - prev;
                }
            }
        }
        previous = Some(p.altitude);
    }
    gain
}

/// How far along the warm-up the receiver is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationProgress {
    /// Not enough accurate fixes yet
    Collecting,
    /// Good enough to start, distance may still be a little off
    Usable,
    Calibrated,
}

impl CalibrationProgress {
    pub fn evaluate(accepted_fixes: usize, current_accuracy: f64, config: &TrackerConfig) -> Self {
        if accepted_fixes == 0 {
            return CalibrationProgress::Collecting;
        }
        if current_accuracy <= config.calibrated_accuracy_m
            && accepted_fixes >= config.calibrated_min_fixes
        {
            CalibrationProgress::Calibrated
        } else if current_accuracy <= config.usable_accuracy_m
            && accepted_fixes >= config.usable_min_fixes
        {
            CalibrationProgress::Usable
        } else {
            CalibrationProgress::Collecting
        }
    }
}
