//! Radio downlink loop
//!
//! Sends every published packet once. A failed transmit is logged and the
//! packet abandoned; a fresher one is always on its way. After a run of
//! consecutive failures the transport is asked to recover.

use crate::error::Result;
use crate::monitor::Monitor;
use crate::radio::RadioTransport;
use crate::stats::{TelemetryStats, bump};
use std::sync::Arc;

/// Consumer that transmits packets
pub struct RadioLink {
    transport: Box<dyn RadioTransport>,
    recover_after: u32,
    failures: u32,
    monitor: Arc<Monitor>,
    stats: Arc<TelemetryStats>,
}

impl RadioLink {
    /// `recover_after` = 0 disables recovery
    pub fn new(
        transport: Box<dyn RadioTransport>,
        recover_after: u32,
        monitor: Arc<Monitor>,
        stats: Arc<TelemetryStats>,
    ) -> Self {
        Self {
            transport,
            recover_after,
            failures: 0,
            monitor,
            stats,
        }
    }

    /// Transmit packets until the monitor shuts down
    pub fn run(&mut self) -> Result<()> {
        log::info!("Radio thread started");
        let monitor = Arc::clone(&self.monitor);
        while let Some(guard) = monitor.await_untransmitted() {
            match guard.packet() {
                Some(packet) => self.send(packet.as_bytes()),
                None => log::debug!("Radio thread: slot empty"),
            }
        }
        log::info!("Radio thread exiting");
        Ok(())
    }

    /// Transmit one packet
    pub fn send(&mut self, bytes: &[u8]) {
        match self.transport.transmit(bytes) {
            Ok(()) => {
                self.failures = 0;
                bump(&self.stats.packets_transmitted);
                log::trace!("Transmitted {} bytes", bytes.len());
            }
            Err(e) => {
                self.failures += 1;
                bump(&self.stats.transmit_errors);
                log::error!("Transmit failed ({} in a row): {}", self.failures, e);
                if self.recover_after > 0 && self.failures >= self.recover_after {
                    self.recover();
                }
            }
        }
    }

    fn recover(&mut self) {
        self.failures = 0;
        bump(&self.stats.radio_recoveries);
        match self.transport.recover() {
            Ok(()) => log::info!("Radio link recovered"),
            Err(e) => log::error!("Radio recovery failed: {}", e),
        }
    }
}
