use std::collections::VecDeque;

use crate::config::TrackerConfig;
use crate::filters::{PositionSmoother, Rejection, RejectionCounts, ValidityFilter};
use crate::position::Position;
use crate::state::GpsState;
use crate::stats::{self, CalibrationProgress, GpsStats};

/// What happened to a fix passed to [`TrackAccumulator::ingest`]
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Failed a plausibility check, only the raw buffer changed
    Rejected(Rejection),
    /// Smoothed fix moved less than the minimum movement
    Stationary { moved_m: f64 },
    /// Smoothed fix appended to the track
    Accepted { position: Position, segment_km: f64 },
}

/// Owns the track: buffers, smoothing state, cumulative distance.
///
/// Every raw fix goes through validity checks, Kalman smoothing and the
/// minimum-movement gate before it can extend the track. Distance only grows
/// on accepted fixes and only [`TrackAccumulator::reset`] clears it.
#[derive(Debug, Clone)]
pub struct TrackAccumulator {
    config: TrackerConfig,
    state: GpsState,
    positions: VecDeque<Position>,
    raw_positions: VecDeque<Position>,
    last_valid: Option<Position>,
    smoother: PositionSmoother,
    validity: ValidityFilter,
    rejections: RejectionCounts,
    stationary: u64,
}

impl TrackAccumulator {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            smoother: PositionSmoother::new(&config),
            validity: ValidityFilter::new(&config),
            positions: VecDeque::with_capacity(config.accepted_buffer_capacity),
            raw_positions: VecDeque::with_capacity(config.raw_buffer_capacity),
            state: GpsState::default(),
            last_valid: None,
            rejections: RejectionCounts::default(),
            stationary: 0,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn ingest(&mut self, raw: Position) -> IngestOutcome {
        push_bounded(&mut self.raw_positions, raw.clone(), self.config.raw_buffer_capacity);

        if let Err(rejection) = self.validity.check(&raw, self.last_valid.as_ref()) {
            log::debug!("Fix at t={:.3} rejected: {}", raw.timestamp, rejection);
            self.rejections.record(&rejection);
            return IngestOutcome::Rejected(rejection);
        }

        let smoothed = self.smoother.smooth(&raw);

        let segment_km = match &self.last_valid {
            Some(last) => {
                let moved_m = last.distance_m(&smoothed);
                if moved_m < self.config.min_movement_m {
                    self.stationary += 1;
                    self.state.apply_instantaneous(&smoothed, &self.config);
                    return IngestOutcome::Stationary { moved_m };
                }
                moved_m / 1000.0
            }
            None => {
                log::info!("First GPS fix, accuracy {:.1} m", raw.accuracy);
                0.0
            }
        };

        push_bounded(
            &mut self.positions,
            smoothed.clone(),
            self.config.accepted_buffer_capacity,
        );
        self.state.total_distance += segment_km;
        self.state.apply_accepted(&smoothed, &self.config);
        self.last_valid = Some(smoothed.clone());

        IngestOutcome::Accepted {
            position: smoothed,
            segment_km,
        }
    }

    /// Clear the track and smoothing state, GPS availability is kept
    pub fn reset(&mut self) {
        self.positions.clear();
        self.raw_positions.clear();
        self.last_valid = None;
        self.smoother.reset();
        self.rejections = RejectionCounts::default();
        self.stationary = 0;
        self.state = GpsState::new(self.state.is_gps_enabled);
    }

    pub fn set_tracking(&mut self, tracking: bool) {
        self.state.is_tracking = tracking;
    }

    pub fn set_gps_enabled(&mut self, enabled: bool) {
        self.state.is_gps_enabled = enabled;
    }

    pub fn state(&self) -> &GpsState {
        &self.state
    }

    pub fn positions(&self) -> &VecDeque<Position> {
        &self.positions
    }

    pub fn raw_positions(&self) -> &VecDeque<Position> {
        &self.raw_positions
    }

    pub fn last_valid(&self) -> Option<&Position> {
        self.last_valid.as_ref()
    }

    pub fn smoother(&self) -> &PositionSmoother {
        &self.smoother
    }

    pub fn rejections(&self) -> RejectionCounts {
        self.rejections
    }

    /// Kilometers
    pub fn distance(&self) -> f64 {
        self.state.total_distance
    }

    pub fn current_speed(&self) -> f64 {
        self.state.speed.unwrap_or(0.0)
    }

    pub fn average_speed(&self) -> f64 {
        stats::average_speed(&self.positions)
    }

    pub fn max_speed(&self) -> f64 {
        stats::max_speed(&self.positions)
    }

    pub fn elevation_gain(&self) -> f64 {
        stats::elevation_gain(&self.positions)
    }

    pub fn stats(&self) -> GpsStats {
        GpsStats {
            average_accuracy: stats::average_accuracy(&self.positions),
            max_speed: self.max_speed(),
            average_speed: self.average_speed(),
            total_elevation_gain: self.elevation_gain(),
            valid_positions: self.positions.len(),
            filtered_positions: self.filtered_count() as usize,
            rejections: self.rejections,
        }
    }

    /// Fixes that never reached the track since the last reset, rejected or stationary.
    /// Counted on ingest so buffer eviction does not hide them.
    pub fn filtered_count(&self) -> u64 {
        self.rejections.total() + self.stationary
    }

    pub fn calibration(&self) -> CalibrationProgress {
        CalibrationProgress::evaluate(self.positions.len(), self.state.accuracy, &self.config)
    }
}

fn push_bounded(buffer: &mut VecDeque<Position>, position: Position, capacity: usize) {
    buffer.push_back(position);
    while buffer.len() > capacity {
        buffer.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SignalStrength;
    use approx::assert_abs_diff_eq;

    fn accumulator() -> TrackAccumulator {
        TrackAccumulator::new(TrackerConfig::default())
    }

    #[test]
    fn test_first_fix_accepted_without_distance() {
        let mut acc = accumulator();
        let outcome = acc.ingest(Position::new(10.0, 20.0, 4.0, 0.0));
        assert_eq!(
            outcome,
            IngestOutcome::Accepted {
                position: Position::new(10.0, 20.0, 4.0, 0.0),
                segment_km: 0.0
            }
        );
        assert_eq!(acc.distance(), 0.0);
        assert_eq!(acc.positions().len(), 1);
        assert_eq!(acc.state().signal_strength, SignalStrength::Excellent);
        assert_eq!(acc.state().last_update, Some(0.0));
    }

    #[test]
    fn test_inaccurate_fix_never_accepted() {
        let mut acc = accumulator();
        let outcome = acc.ingest(Position::new(10.0, 20.0, 100.0, 0.0).with_speed(2.0));
        assert!(matches!(outcome, IngestOutcome::Rejected(Rejection::Accuracy(_))));
        assert!(acc.positions().is_empty());
        assert_eq!(acc.raw_positions().len(), 1);
        assert_eq!(acc.state(), &GpsState::default());
        assert_eq!(acc.rejections().accuracy, 1);
    }

    #[test]
    fn test_teleport_rejected() {
        let mut acc = accumulator();
        acc.ingest(Position::new(0.0, 0.0, 5.0, 0.0));
        let outcome = acc.ingest(Position::new(0.009, 0.0, 5.0, 1.0));
        assert!(matches!(outcome, IngestOutcome::Rejected(Rejection::Teleport { .. })));
        assert_eq!(acc.positions().len(), 1);
        assert_eq!(acc.distance(), 0.0);
    }

    #[test]
    fn test_small_movement_suppressed() {
        let mut acc = accumulator();
        acc.ingest(Position::new(0.0, 0.0, 5.0, 0.0));
        // ~1.1 m east
        let outcome = acc.ingest(Position::new(0.0, 0.00001, 5.0, 1.0).with_speed(1.0));
        assert!(matches!(outcome, IngestOutcome::Stationary { .. }));
        assert_eq!(acc.distance(), 0.0);
        assert_eq!(acc.positions().len(), 1);
        // Instantaneous speed still follows the latest fix
        assert_eq!(acc.current_speed(), 1.0);
        assert_eq!(acc.state().last_update, Some(0.0));
    }

    #[test]
    fn test_distance_accumulates() {
        let mut acc = accumulator();
        acc.ingest(Position::new(0.0, 0.0, 5.0, 0.0));
        let outcome = acc.ingest(Position::new(0.0, 0.001, 5.0, 10.0));
        let segment_km = match outcome {
            IngestOutcome::Accepted { segment_km, .. } => segment_km,
            other => panic!("expected accepted fix, got {:?}", other),
        };
        assert_abs_diff_eq!(acc.distance(), segment_km, epsilon = 1e-12);
        assert_abs_diff_eq!(acc.distance(), 0.1112, epsilon = 1e-3);
    }

    #[test]
    fn test_buffers_are_bounded() {
        let config = TrackerConfig {
            raw_buffer_capacity: 5,
            accepted_buffer_capacity: 3,
            ..TrackerConfig::default()
        };
        let mut acc = TrackAccumulator::new(config);
        for i in 0..10 {
            // ~11 m steps every 2 s
            acc.ingest(Position::new(0.0, i as f64 * 0.0001, 5.0, i as f64 * 2.0));
        }
        assert_eq!(acc.raw_positions().len(), 5);
        assert_eq!(acc.positions().len(), 3);
        assert_eq!(acc.raw_positions().back().map(|p| p.timestamp), Some(18.0));
    }

    #[test]
    fn test_reset_keeps_gps_enabled() {
        let mut acc = accumulator();
        acc.set_gps_enabled(true);
        acc.set_tracking(true);
        acc.ingest(Position::new(0.0, 0.0, 5.0, 0.0));
        acc.ingest(Position::new(0.0, 0.001, 5.0, 10.0));
        acc.ingest(Position::new(0.0, 0.001, 90.0, 11.0));
        acc.reset();

        assert_eq!(acc.distance(), 0.0);
        assert!(acc.positions().is_empty());
        assert!(acc.raw_positions().is_empty());
        assert!(acc.last_valid().is_none());
        assert!(!acc.smoother().is_initialized());
        assert_eq!(acc.rejections().total(), 0);
        assert!(acc.state().is_gps_enabled);
        assert!(!acc.state().is_tracking);

        // Cold start: next fix taken as-is, even far from the old track
        let p = Position::new(45.0, 45.0, 5.0, 12.0);
        assert_eq!(
            acc.ingest(p.clone()),
            IngestOutcome::Accepted {
                position: p,
                segment_km: 0.0
            }
        );
    }

    #[test]
    fn test_stats_counts() {
        let mut acc = accumulator();
        acc.ingest(Position::new(0.0, 0.0, 4.0, 0.0).with_speed(2.0).with_altitude(10.0));
        acc.ingest(Position::new(0.0, 0.0001, 6.0, 5.0).with_speed(3.0).with_altitude(14.0));
        acc.ingest(Position::new(0.0, 0.0001, 70.0, 6.0));
        acc.ingest(Position::new(0.0, 0.0002, 5.0, 10.0).with_speed(0.0).with_altitude(12.0));

        let stats = acc.stats();
        assert_eq!(stats.valid_positions, 3);
        assert_eq!(stats.filtered_positions, 1);
        assert_eq!(stats.max_speed, 3.0);
        assert_eq!(stats.average_speed, 2.5);
        assert_eq!(stats.total_elevation_gain, 4.0);
        assert_abs_diff_eq!(stats.average_accuracy, 5.0, epsilon = 1e-12);
        assert_eq!(stats.rejections.accuracy, 1);
    }

    #[test]
    fn test_filtered_count_survives_raw_eviction() {
        let mut acc = accumulator();
        let n = acc.config().raw_buffer_capacity * 2;
        for i in 0..n {
            let accuracy = if i % 4 == 3 { 80.0 } else { 5.0 };
            // ~3.3 m/s jog
            acc.ingest(Position::new(0.0, i as f64 * 3e-5, accuracy, i as f64));
        }

        let stats = acc.stats();
        assert_eq!(acc.raw_positions().len(), acc.config().raw_buffer_capacity);
        assert_eq!(stats.rejections.accuracy, (n / 4) as u64);
        assert!(stats.filtered_positions >= n / 4);
        assert_eq!(stats.valid_positions + stats.filtered_positions, n);
    }

    #[test]
    fn test_stationary_fixes_count_as_filtered() {
        let mut acc = accumulator();
        acc.ingest(Position::new(51.5, -0.12, 5.0, 0.0));
        acc.ingest(Position::new(51.500009, -0.12, 5.0, 1.0));
        assert_eq!(acc.stats().filtered_positions, 1);

        acc.reset();
        assert_eq!(acc.filtered_count(), 0);
    }
}
