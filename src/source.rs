use anyhow::Context;
use crossbeam::channel::{unbounded, Receiver};
use flate2::read::GzDecoder;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::LocationError;
use crate::position::Position;

/// Item delivered by a location subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationEvent {
    Fix(Position),
    Error(LocationError),
}

/// Platform positioning, split into an async acquire and a sync subscription.
///
/// `acquire` checks (and if needed requests) permission and resolves with a
/// current fix. `subscribe` starts the fix stream; after `unsubscribe`
/// returns, nothing more may be read from the previous receiver.
pub trait LocationSource {
    fn acquire(&mut self) -> BoxFuture<'_, Result<Position, LocationError>>;

    fn subscribe(&mut self) -> Result<Receiver<LocationEvent>, LocationError>;

    fn unsubscribe(&mut self);
}

#[derive(Deserialize)]
struct ReplayLog {
    events: Vec<LocationEvent>,
}

/// Replays a recorded sequence of fixes and errors.
///
/// `acquire` consumes the next event. Each subscription delivers events up
/// to and including the next error, then the stream ends, which is how a
/// dropped platform subscription looks to the tracker. Subscribing again
/// continues where the log left off.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    events: Vec<LocationEvent>,
    cursor: usize,
    permission: Result<(), LocationError>,
    subscribed: bool,
    subscribe_count: u32,
}

impl ReplaySource {
    pub fn new(events: Vec<LocationEvent>) -> Self {
        Self {
            events,
            cursor: 0,
            permission: Ok(()),
            subscribed: false,
            subscribe_count: 0,
        }
    }

    pub fn from_fixes(fixes: impl IntoIterator<Item = Position>) -> Self {
        Self::new(fixes.into_iter().map(LocationEvent::Fix).collect())
    }

    /// Source whose permission check always fails with `error`
    pub fn denied(error: LocationError) -> Self {
        Self {
            permission: Err(error),
            ..Self::new(Vec::new())
        }
    }

    /// Load `{"events": [...]}` from a `.json` or gzip-compressed `.json.gz` file
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let reader: Box<dyn Read> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let log: ReplayLog = serde_json::from_reader(BufReader::new(reader))
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self::new(log.events))
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

impl LocationSource for ReplaySource {
    fn acquire(&mut self) -> BoxFuture<'_, Result<Position, LocationError>> {
        let result = match self.permission {
            Err(e) => Err(e),
            Ok(()) => match self.events.get(self.cursor).cloned() {
                Some(LocationEvent::Fix(position)) => {
                    self.cursor += 1;
                    Ok(position)
                }
                Some(LocationEvent::Error(e)) => {
                    self.cursor += 1;
                    Err(e)
                }
                None => Err(LocationError::PositionUnavailable),
            },
        };
        async move { result }.boxed()
    }

    fn subscribe(&mut self) -> Result<Receiver<LocationEvent>, LocationError> {
        self.permission?;
        let (tx, rx) = unbounded();
        while let Some(event) = self.events.get(self.cursor).cloned() {
            self.cursor += 1;
            let is_error = matches!(event, LocationEvent::Error(_));
            // Receiver is local, send cannot fail here
            let _ = tx.send(event);
            if is_error {
                break;
            }
        }
        self.subscribed = true;
        self.subscribe_count += 1;
        Ok(rx)
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }
}
