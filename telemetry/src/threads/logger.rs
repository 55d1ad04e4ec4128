//! Power-safe logging loop
//!
//! Appends every published packet to `log<seq>.bin`. When a write would
//! cross the size ceiling the writer rotates to `log<seq+1>.bin` and retries
//! the same packet once on the new file. If rotation or the retry fails the
//! packet is dropped from the log (and counted); the loop carries on.

use crate::error::{Error, Result};
use crate::monitor::Monitor;
use crate::stats::{TelemetryStats, bump};
use crate::storage::{LogSink, LogStorage, log_file_name, recover_sequence};
use std::sync::Arc;

/// Consumer that persists packets
pub struct LogWriter {
    storage: Box<dyn LogStorage>,
    sink: Box<dyn LogSink>,
    seq: u32,
    sync_every: u32,
    unsynced: u32,
    monitor: Arc<Monitor>,
    stats: Arc<TelemetryStats>,
}

impl LogWriter {
    /// Resume numbering after the newest existing file and open it.
    ///
    /// Failing to create the first file is fatal for the logger.
    pub fn open(
        mut storage: Box<dyn LogStorage>,
        sync_every: u32,
        monitor: Arc<Monitor>,
        stats: Arc<TelemetryStats>,
    ) -> Result<Self> {
        let seq = recover_sequence(storage.as_ref());
        let sink = storage.create(seq)?;
        log::info!("Log sequence resumes at {}", log_file_name(seq));
        Ok(Self {
            storage,
            sink,
            seq,
            sync_every: sync_every.max(1),
            unsynced: 0,
            monitor,
            stats,
        })
    }

    /// Sequence number of the open file
    pub fn sequence(&self) -> u32 {
        self.seq
    }

    /// Log packets until the monitor shuts down
    pub fn run(&mut self) -> Result<()> {
        log::info!("Log thread started");
        let monitor = Arc::clone(&self.monitor);
        while let Some(guard) = monitor.await_unlogged() {
            match guard.packet() {
                Some(packet) => self.write(packet.as_bytes()),
                None => log::debug!("Log thread: slot empty"),
            }
        }
        self.sync();
        log::info!("Log thread exiting");
        Ok(())
    }

    /// Append one packet, rotating if the file is full
    pub fn write(&mut self, bytes: &[u8]) {
        let result = match self.sink.append(bytes) {
            Err(Error::LogFull { .. }) => self.rotate().and_then(|()| self.sink.append(bytes)),
            other => other,
        };

        match result {
            Ok(()) => {
                bump(&self.stats.packets_logged);
                self.unsynced += 1;
                if self.unsynced >= self.sync_every {
                    self.sync();
                }
            }
            Err(e) => {
                log::error!("Packet not logged: {}", e);
                bump(&self.stats.log_errors);
            }
        }
    }

    fn sync(&mut self) {
        if self.unsynced == 0 {
            return;
        }
        match self.sink.sync() {
            Ok(()) => log::trace!("Synced {} ({} bytes)", log_file_name(self.seq), self.sink.size()),
            Err(e) => log::warn!("Sync of {} failed: {}", log_file_name(self.seq), e),
        }
        self.unsynced = 0;
    }

    fn rotate(&mut self) -> Result<()> {
        self.sync();
        let next = self.seq.wrapping_add(1);
        self.sink = self.storage.create(next)?;
        self.seq = next;
        bump(&self.stats.log_rotations);
        log::info!("Rotated log to {}", log_file_name(next));
        Ok(())
    }
}
