//! Channel-backed sensor hub
//!
//! Every sensor shares one bounded channel, so waiting on the receiver is a
//! wait on all sources at once. A sensor that never produces simply never
//! sends; it cannot stall the others.

use super::{SensorEvent, SensorHub};
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::time::Duration;

/// Sending side handed to each sensor
#[derive(Clone)]
pub struct SensorFeed {
    name: &'static str,
    tx: Sender<SensorEvent>,
}

impl SensorFeed {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rename a clone of this feed for another sensor
    pub fn for_sensor(&self, name: &'static str) -> Self {
        Self {
            name,
            tx: self.tx.clone(),
        }
    }

    /// Queue an event without blocking.
    ///
    /// Returns `false` once the hub is gone. A full queue drops the event.
    pub fn push(&self, event: SensorEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("{}: hub queue full, sample dropped", self.name);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// [`SensorHub`] over a shared bounded channel
pub struct ChannelSensorHub {
    rx: Receiver<SensorEvent>,
    pending: Option<SensorEvent>,
}

impl ChannelSensorHub {
    /// Create a hub holding at most `depth` queued events
    pub fn new(depth: usize) -> (Self, SensorFeed) {
        let (tx, rx) = bounded(depth);
        (
            Self { rx, pending: None },
            SensorFeed { name: "sensor", tx },
        )
    }
}

impl SensorHub for ChannelSensorHub {
    fn wait_ready(&mut self, timeout: Duration) -> Result<bool> {
        if self.pending.is_some() || !self.rx.is_empty() {
            return Ok(true);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                self.pending = Some(event);
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(Error::SensorsClosed),
        }
    }

    fn try_next(&mut self) -> Option<SensorEvent> {
        self.pending.take().or_else(|| self.rx.try_recv().ok())
    }
}
