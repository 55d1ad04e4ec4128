//! Pipeline counters shared by the three loops

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters, one writer per field
#[derive(Debug, Default)]
pub struct TelemetryStats {
    pub packets_published: AtomicU64,
    pub blocks_appended: AtomicU64,
    /// Blocks that hit a full packet and were not sent
    pub blocks_dropped: AtomicU64,
    pub sensor_errors: AtomicU64,
    pub packets_logged: AtomicU64,
    /// Packets that never reached storage
    pub log_errors: AtomicU64,
    pub log_rotations: AtomicU64,
    pub packets_transmitted: AtomicU64,
    pub transmit_errors: AtomicU64,
    pub radio_recoveries: AtomicU64,
}

/// Point-in-time copy of [`TelemetryStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub packets_published: u64,
    pub blocks_appended: u64,
    pub blocks_dropped: u64,
    pub sensor_errors: u64,
    pub packets_logged: u64,
    pub log_errors: u64,
    pub log_rotations: u64,
    pub packets_transmitted: u64,
    pub transmit_errors: u64,
    pub radio_recoveries: u64,
}

#[inline]
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl TelemetryStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            packets_published: get(&self.packets_published),
            blocks_appended: get(&self.blocks_appended),
            blocks_dropped: get(&self.blocks_dropped),
            sensor_errors: get(&self.sensor_errors),
            packets_logged: get(&self.packets_logged),
            log_errors: get(&self.log_errors),
            log_rotations: get(&self.log_rotations),
            packets_transmitted: get(&self.packets_transmitted),
            transmit_errors: get(&self.transmit_errors),
            radio_recoveries: get(&self.radio_recoveries),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "published={} blocks={} (dropped {}, sensor errors {}) | logged={} (errors {}, rotations {}) | transmitted={} (errors {}, recoveries {})",
            self.packets_published,
            self.blocks_appended,
            self.blocks_dropped,
            self.sensor_errors,
            self.packets_logged,
            self.log_errors,
            self.log_rotations,
            self.packets_transmitted,
            self.transmit_errors,
            self.radio_recoveries,
        )
    }
}
