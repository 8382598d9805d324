use approx::assert_abs_diff_eq;
use gps_tracker_rs::{
    haversine_km, GpsTracker, IngestOutcome, LocationError, LocationEvent, Position,
    ReplaySource, SignalStrength, TrackAccumulator, TrackerConfig,
};

fn jittery_run(n: usize) -> Vec<Position> {
    // Eastward run at ~3.3 m/s with a mix of bad fixes
    let jitter = [0.0, 2e-6, -3e-6, 1e-6, -1e-6, 3e-6, -2e-6];
    (0..n)
        .map(|i| {
            let t = 1_700_000_000.0 + i as f64;
            let lon = i as f64 * 3e-5 + jitter[i % jitter.len()];
            let accuracy = match i % 11 {
                5 => 80.0,
                7 => 25.0,
                _ => 4.0 + (i % 5) as f64,
            };
            let mut p = Position::new(0.0 + jitter[(i + 3) % jitter.len()], lon, accuracy, t)
                .with_speed(3.3)
                .with_altitude(50.0 + (i % 9) as f64);
            if i % 17 == 9 {
                // Teleport spike
                p.latitude += 0.01;
            }
            p
        })
        .collect()
}

#[tokio::test]
async fn end_to_end_two_fixes() {
    let source = ReplaySource::from_fixes(vec![
        Position::new(0.0, 0.0, 5.0, 0.0),
        Position::new(0.0, 0.001, 5.0, 1.0),
    ]);
    let mut tracker = GpsTracker::new(source, TrackerConfig::default());
    tracker.start_tracking().await.unwrap();
    tracker.poll();

    let state = tracker.get_state();
    assert_abs_diff_eq!(state.total_distance, 0.111, epsilon = 1e-3);
    assert_eq!(state.signal_strength, SignalStrength::Excellent);
    assert!(state.is_tracking);
}

#[test]
fn distance_is_monotonic_and_sums_accepted_segments() {
    let mut acc = TrackAccumulator::new(TrackerConfig::default());
    let mut previous = 0.0;
    for p in jittery_run(200) {
        acc.ingest(p);
        let d = acc.distance();
        assert!(d >= previous, "distance decreased: {} -> {}", previous, d);
        previous = d;
    }

    let positions: Vec<&Position> = acc.positions().iter().collect();
    let pairwise: f64 = positions
        .windows(2)
        .map(|w| haversine_km(w[0].latitude, w[0].longitude, w[1].latitude, w[1].longitude))
        .sum();
    assert_abs_diff_eq!(acc.distance(), pairwise, epsilon = 1e-9);
    assert!(acc.distance() > 0.5);

    let stats = acc.stats();
    assert!(stats.rejections.accuracy > 0);
    assert!(stats.rejections.teleport > 0);
    assert_eq!(
        stats.valid_positions + stats.filtered_positions,
        acc.raw_positions().len()
    );
}

#[test]
fn coarse_fix_never_accepted() {
    let mut acc = TrackAccumulator::new(TrackerConfig::default());
    acc.ingest(Position::new(0.0, 0.0, 5.0, 0.0));
    let coarse = Position::new(0.0, 0.0003, 100.0, 10.0)
        .with_speed(3.0)
        .with_altitude(10.0)
        .with_heading(90.0);
    assert!(matches!(acc.ingest(coarse), IngestOutcome::Rejected(_)));
    assert!(acc.positions().iter().all(|p| p.accuracy != 100.0));
}

#[test]
fn teleport_one_km_in_one_second_rejected() {
    let mut acc = TrackAccumulator::new(TrackerConfig::default());
    acc.ingest(Position::new(10.0, 10.0, 5.0, 0.0));
    // ~1 km north
    acc.ingest(Position::new(10.009, 10.0, 5.0, 1.0));
    assert_eq!(acc.positions().len(), 1);
    assert_eq!(acc.distance(), 0.0);
}

#[test]
fn one_meter_of_jitter_adds_no_distance() {
    let mut acc = TrackAccumulator::new(TrackerConfig::default());
    acc.ingest(Position::new(51.5, -0.12, 5.0, 0.0));
    // 1 m north is ~9e-6 degrees
    acc.ingest(Position::new(51.500009, -0.12, 5.0, 1.0));
    assert_eq!(acc.distance(), 0.0);
}

#[test]
fn signal_strength_follows_latest_accuracy() {
    let mut acc = TrackAccumulator::new(TrackerConfig::default());
    let cases = [
        (4.0, SignalStrength::Excellent),
        (8.0, SignalStrength::Good),
        (15.0, SignalStrength::Fair),
        (30.0, SignalStrength::Poor),
    ];
    for (i, (accuracy, expected)) in cases.iter().enumerate() {
        // ~22 m steps every 10 s
        acc.ingest(Position::new(0.0, i as f64 * 0.0002, *accuracy, i as f64 * 10.0));
        assert_eq!(acc.state().signal_strength, *expected, "accuracy {}", accuracy);
    }
}

#[test]
fn reset_then_cold_start() {
    let mut acc = TrackAccumulator::new(TrackerConfig::default());
    for p in jittery_run(30) {
        acc.ingest(p);
    }
    assert!(acc.distance() > 0.0);

    acc.reset();
    assert_eq!(acc.distance(), 0.0);
    assert!(acc.positions().is_empty());
    assert!(acc.raw_positions().is_empty());

    // Far away and long after: still seeded directly
    let fresh = Position::new(-33.86, 151.2, 6.0, 1_800_000_000.0);
    match acc.ingest(fresh.clone()) {
        IngestOutcome::Accepted {
            position,
            segment_km,
        } => {
            assert_eq!(position, fresh);
            assert_eq!(segment_km, 0.0);
        }
        other => panic!("expected cold start, got {:?}", other),
    }
}

#[tokio::test]
async fn timeout_mid_run_recovers_and_keeps_distance() {
    let mut events: Vec<LocationEvent> = jittery_run(20)
        .into_iter()
        .map(LocationEvent::Fix)
        .collect();
    events.insert(10, LocationEvent::Error(LocationError::Timeout));
    let config = TrackerConfig {
        timeout_restart_delay_ms: 0,
        ..TrackerConfig::default()
    };

    let mut tracker = GpsTracker::new(ReplaySource::new(events), config);
    tracker.start_tracking().await.unwrap();
    tracker.poll();
    let before = tracker.get_distance();
    assert!(tracker.has_pending_restart());

    tracker.poll();
    assert_eq!(tracker.restart_count(), 1);
    assert!(tracker.get_distance() >= before);
    assert!(tracker.source().is_exhausted());
    assert_eq!(tracker.get_raw_positions().len(), 20);
}
