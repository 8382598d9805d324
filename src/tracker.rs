use crossbeam::channel::{Receiver, TryRecvError};
use std::time::Instant;

use crate::accumulator::{IngestOutcome, TrackAccumulator};
use crate::config::TrackerConfig;
use crate::error::{LocationError, TrackerError, TrackerResult};
use crate::events::{DeviceEvent, DeviceSnapshot, NoopObserver, TrackerObserver};
use crate::export::TrackingExport;
use crate::position::Position;
use crate::source::{LocationEvent, LocationSource};
use crate::state::GpsState;
use crate::stats::{CalibrationProgress, GpsStats};

/// GPS session controller.
///
/// Drives a [`LocationSource`], feeds its fixes through the
/// [`TrackAccumulator`] and notifies a [`TrackerObserver`]. Everything runs on
/// the caller's thread: fixes are processed one at a time from [`poll`].
///
/// Lifecycle: construct per session, [`start_tracking`], [`poll`] on every
/// wake-up, [`stop_tracking`], then [`reset`] or drop.
///
/// [`poll`]: GpsTracker::poll
/// [`start_tracking`]: GpsTracker::start_tracking
/// [`stop_tracking`]: GpsTracker::stop_tracking
/// [`reset`]: GpsTracker::reset
pub struct GpsTracker<S: LocationSource> {
    source: S,
    observer: Box<dyn TrackerObserver + Send>,
    accumulator: TrackAccumulator,
    subscription: Option<Receiver<LocationEvent>>,
    pending_restart: Option<Instant>,
    restart_count: u32,
    devices: DeviceSnapshot,
    switched_off: bool,
}

impl<S: LocationSource> GpsTracker<S> {
    pub fn new(source: S, config: TrackerConfig) -> Self {
        Self {
            source,
            observer: Box::new(NoopObserver),
            accumulator: TrackAccumulator::new(config),
            subscription: None,
            pending_restart: None,
            restart_count: 0,
            devices: DeviceSnapshot::default(),
            switched_off: false,
        }
    }

    pub fn with_observer(mut self, observer: impl TrackerObserver + Send + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Permission and availability check, also yields the current fix
    pub async fn check_availability(&mut self) -> Result<Position, LocationError> {
        match self.source.acquire().await {
            Ok(position) => {
                log::info!(
                    "Location permission granted, initial accuracy {:.1} m",
                    position.accuracy
                );
                self.accumulator.set_gps_enabled(true);
                Ok(position)
            }
            Err(e) => {
                if matches!(e, LocationError::PermissionDenied | LocationError::Unsupported) {
                    self.accumulator.set_gps_enabled(false);
                }
                log::warn!("GPS unavailable: {}", e.user_message());
                self.observer.on_error(e);
                Err(e)
            }
        }
    }

    /// Begin a session. Calling it while already tracking is a no-op.
    ///
    /// Fails with [`TrackerError::GpsDisabled`] without touching the source
    /// while GPS is switched off through [`GpsTracker::set_gps_enabled`].
    pub async fn start_tracking(&mut self) -> TrackerResult<()> {
        if self.subscription.is_some() {
            log::warn!("Tracking already active");
            return Ok(());
        }
        if self.switched_off {
            log::warn!("GPS is switched off, not starting");
            return Err(TrackerError::GpsDisabled);
        }

        let initial_fix = self.check_availability().await?;

        let rx = match self.source.subscribe() {
            Ok(rx) => rx,
            Err(e) => {
                log::warn!("Could not subscribe to location updates: {}", e);
                self.observer.on_error(e);
                return Err(e.into());
            }
        };

        log::info!("GPS tracking started");
        self.subscription = Some(rx);
        self.pending_restart = None;
        self.accumulator.set_tracking(true);
        self.observer.on_state_change(self.accumulator.state());

        self.ingest(initial_fix);
        Ok(())
    }

    /// End the session, buffers and distance are kept. Safe to call twice.
    pub fn stop_tracking(&mut self) {
        self.pending_restart = None;
        if self.subscription.take().is_some() {
            self.source.unsubscribe();
            log::info!(
                "GPS tracking stopped, {:.3} km recorded",
                self.accumulator.distance()
            );
        }
        if self.accumulator.state().is_tracking {
            self.accumulator.set_tracking(false);
            self.observer.on_state_change(self.accumulator.state());
        }
    }

    /// Drain every event the source has queued, running any due restart first.
    /// Returns the number of events handled.
    pub fn poll(&mut self) -> usize {
        self.run_pending_restart(Instant::now());

        let mut handled = 0;
        loop {
            let event = match &self.subscription {
                Some(rx) => match rx.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                },
                None => break,
            };
            handled += 1;
            match event {
                LocationEvent::Fix(position) => {
                    self.ingest(position);
                }
                LocationEvent::Error(e) => self.handle_error(e),
            }
        }
        handled
    }

    /// Run one fix through the pipeline and notify. Fixes arriving while not
    /// tracking are dropped and `None` is returned.
    pub fn ingest(&mut self, raw: Position) -> Option<IngestOutcome> {
        if !self.accumulator.state().is_tracking {
            log::debug!("Ignoring fix at t={:.3}, not tracking", raw.timestamp);
            return None;
        }

        let outcome = self.accumulator.ingest(raw);
        match &outcome {
            IngestOutcome::Accepted {
                position,
                segment_km,
            } => {
                let state = self.accumulator.state();
                if *segment_km > 0.0 {
                    self.observer.on_distance_update(state.total_distance);
                }
                self.observer.on_state_change(state);
                self.observer.on_position_update(position, state);
            }
            IngestOutcome::Stationary { .. } => {
                self.observer.on_state_change(self.accumulator.state());
            }
            IngestOutcome::Rejected(_) => {}
        }
        Some(outcome)
    }

    /// Route a source error. A timeout while tracking schedules one
    /// resubscribe; losing permission ends the session.
    pub fn handle_error(&mut self, error: LocationError) {
        log::warn!("GPS error: {}", error);
        self.observer.on_error(error);

        let tracking = self.accumulator.state().is_tracking;
        match error {
            e if e.is_recoverable() => {
                if tracking && self.pending_restart.is_none() {
                    let delay = self.accumulator.config().timeout_restart_delay();
                    log::info!(
                        "GPS timeout, resubscribing in {:.1}s",
                        delay.as_secs_f64()
                    );
                    self.pending_restart = Some(Instant::now() + delay);
                }
            }
            LocationError::PermissionDenied | LocationError::Unsupported => {
                self.accumulator.set_gps_enabled(false);
                if tracking {
                    log::warn!("Location access lost, tracking interrupted");
                    self.stop_tracking();
                }
            }
            _ => {}
        }
    }

    fn run_pending_restart(&mut self, now: Instant) {
        let due = matches!(self.pending_restart, Some(at) if at <= now);
        if !due {
            return;
        }
        self.pending_restart = None;
        if !self.accumulator.state().is_tracking {
            return;
        }

        self.subscription = None;
        self.source.unsubscribe();
        self.restart_count += 1;
        match self.source.subscribe() {
            Ok(rx) => {
                log::info!("GPS subscription restarted (restart #{})", self.restart_count);
                self.subscription = Some(rx);
            }
            Err(e) => {
                log::warn!("GPS restart failed: {}", e);
                self.observer.on_error(e);
                if matches!(e, LocationError::PermissionDenied | LocationError::Unsupported) {
                    self.accumulator.set_gps_enabled(false);
                }
                self.stop_tracking();
            }
        }
    }

    pub fn has_pending_restart(&self) -> bool {
        self.pending_restart.is_some()
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// GPS switched on or off outside a start/stop cycle. Switching it off
    /// ends a running session and blocks [`GpsTracker::start_tracking`] until
    /// it is switched back on. One state change is published either way.
    pub fn set_gps_enabled(&mut self, enabled: bool) {
        self.switched_off = !enabled;
        self.accumulator.set_gps_enabled(enabled);
        if !enabled && self.accumulator.state().is_tracking {
            log::warn!("GPS disabled while tracking, stopping");
            self.stop_tracking();
        } else {
            self.observer.on_state_change(self.accumulator.state());
        }
    }

    /// Stop tracking and clear the track, smoothing state and counters
    pub fn reset(&mut self) {
        self.stop_tracking();
        self.accumulator.reset();
        self.restart_count = 0;
        self.devices = DeviceSnapshot::default();
    }

    pub fn record_device_event(&mut self, event: DeviceEvent) {
        self.devices.apply(event);
    }

    pub fn devices(&self) -> DeviceSnapshot {
        self.devices
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn accumulator(&self) -> &TrackAccumulator {
        &self.accumulator
    }

    pub fn get_state(&self) -> GpsState {
        self.accumulator.state().clone()
    }

    pub fn get_positions(&self) -> Vec<Position> {
        self.accumulator.positions().iter().cloned().collect()
    }

    pub fn get_raw_positions(&self) -> Vec<Position> {
        self.accumulator.raw_positions().iter().cloned().collect()
    }

    /// Kilometers
    pub fn get_distance(&self) -> f64 {
        self.accumulator.distance()
    }

    pub fn get_current_speed(&self) -> f64 {
        self.accumulator.current_speed()
    }

    pub fn get_average_speed(&self) -> f64 {
        self.accumulator.average_speed()
    }

    pub fn get_max_speed(&self) -> f64 {
        self.accumulator.max_speed()
    }

    pub fn get_elevation_gain(&self) -> f64 {
        self.accumulator.elevation_gain()
    }

    pub fn get_stats(&self) -> GpsStats {
        self.accumulator.stats()
    }

    pub fn calibration(&self) -> CalibrationProgress {
        self.accumulator.calibration()
    }

    pub fn export(&self) -> TrackingExport {
        TrackingExport::from_tracker(&self.accumulator, self.devices)
    }
}
