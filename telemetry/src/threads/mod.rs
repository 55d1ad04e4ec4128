//! Pipeline threads
//!
//! Three loops coordinated only through the [`Monitor`]:
//! - Packet thread: assembles packets from sensor readings and publishes them
//! - Log thread: appends each packet to power-safe storage
//! - Radio thread: transmits each packet
//!
//! Storage and radio are opened on their own threads, so a device that cannot
//! be opened stops only the loop that needs it. The pipeline keeps running
//! while the packet loop and at least one consumer are alive.

mod logger;
mod packet;
mod radio;

pub use logger::LogWriter;
pub use packet::{POOL_SIZE, PacketAssembler};
pub use radio::RadioLink;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::monitor::Monitor;
use crate::radio::RadioTransport;
use crate::sensors::{BatterySource, SensorHub};
use crate::stats::{StatsSnapshot, TelemetryStats};
use crate::storage::LogStorage;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Liveness of the pipeline as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineHealth {
    /// All three loops running
    Running,
    /// Packets still flow to at least one consumer
    Degraded,
    /// No packets are produced or none can be consumed
    Stopped,
}

impl PipelineHealth {
    /// Classify from which loops have ended.
    ///
    /// One consumer going down leaves the other serving packets; losing the
    /// packet loop or both consumers ends the pipeline.
    pub fn from_finished(packet: bool, log: bool, radio: bool) -> Self {
        match (packet, log, radio) {
            (false, false, false) => Self::Running,
            (false, false, true) | (false, true, false) => Self::Degraded,
            _ => Self::Stopped,
        }
    }
}

/// How the pipeline ended
#[derive(Debug, Clone)]
pub struct PipelineExit {
    pub stats: StatsSnapshot,
    /// Loops that returned an error or panicked
    pub failed: Vec<&'static str>,
}

impl PipelineExit {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Handles for the running pipeline
pub struct ThreadHandles {
    pub packet: JoinHandle<Result<()>>,
    pub log: JoinHandle<Result<()>>,
    pub radio: JoinHandle<Result<()>>,
    pub monitor: Arc<Monitor>,
    pub stats: Arc<TelemetryStats>,
}

impl ThreadHandles {
    /// Ask every loop to stop
    pub fn shutdown(&self) {
        self.monitor.shutdown();
    }

    pub fn health(&self) -> PipelineHealth {
        PipelineHealth::from_finished(
            self.packet.is_finished(),
            self.log.is_finished(),
            self.radio.is_finished(),
        )
    }

    /// Names of the loops that have ended so far
    pub fn finished(&self) -> Vec<&'static str> {
        [
            ("packet", &self.packet),
            ("log", &self.log),
            ("radio", &self.radio),
        ]
        .into_iter()
        .filter(|(_, handle)| handle.is_finished())
        .map(|(name, _)| name)
        .collect()
    }

    /// Wait for all loops and report which ones failed
    pub fn join(self) -> PipelineExit {
        let mut failed = Vec::new();
        for (name, handle) in [
            ("packet", self.packet),
            ("log", self.log),
            ("radio", self.radio),
        ] {
            match handle.join() {
                Ok(Ok(())) => log::debug!("{} thread finished", name),
                // Already logged by the thread
                Ok(Err(_)) => failed.push(name),
                Err(_) => {
                    log::error!("{} thread panicked", name);
                    failed.push(name);
                }
            }
        }
        PipelineExit {
            stats: self.stats.snapshot(),
            failed,
        }
    }
}

/// Log a loop's error as soon as it ends
fn report(name: &str, result: Result<()>) -> Result<()> {
    if let Err(e) = &result {
        log::error!("{} thread stopped: {}", name, e);
    }
    result
}

/// Spawn the packet, log and radio threads.
///
/// `open_storage` and `open_radio` run on the thread that uses them.
pub fn spawn_threads<S, R>(
    config: &Config,
    sensors: Box<dyn SensorHub>,
    battery: Option<Box<dyn BatterySource>>,
    open_storage: S,
    open_radio: R,
) -> Result<ThreadHandles>
where
    S: FnOnce() -> Result<Box<dyn LogStorage>> + Send + 'static,
    R: FnOnce() -> Result<Box<dyn RadioTransport>> + Send + 'static,
{
    let monitor = Arc::new(Monitor::new());
    let stats = Arc::new(TelemetryStats::default());

    let mut assembler = PacketAssembler::new(
        &config.radio.callsign,
        config.packet.max_len,
        Duration::from_millis(config.packet.timeout_ms),
        sensors,
        Arc::clone(&monitor),
        Arc::clone(&stats),
    );
    if let Some(battery) = battery {
        assembler = assembler.with_battery(battery);
    }

    // Consumers first so the first publish finds them waiting
    let sync_every = config.storage.sync_every;
    let log_monitor = Arc::clone(&monitor);
    let log_stats = Arc::clone(&stats);
    let log_handle = thread::Builder::new()
        .name("log".into())
        .spawn(move || {
            let result = open_storage()
                .and_then(|storage| LogWriter::open(storage, sync_every, log_monitor, log_stats))
                .and_then(|mut writer| writer.run());
            report("Log", result)
        })
        .map_err(|e| Error::Other(format!("Failed to spawn log thread: {}", e)))?;

    let recover_after = config.radio.recover_after;
    let radio_monitor = Arc::clone(&monitor);
    let radio_stats = Arc::clone(&stats);
    let radio_handle = thread::Builder::new()
        .name("radio".into())
        .spawn(move || {
            let result = open_radio().and_then(|transport| {
                RadioLink::new(transport, recover_after, radio_monitor, radio_stats).run()
            });
            report("Radio", result)
        })
        .map_err(|e| Error::Other(format!("Failed to spawn radio thread: {}", e)))?;

    let packet_handle = thread::Builder::new()
        .name("packet".into())
        .spawn(move || report("Packet", assembler.run()))
        .map_err(|e| Error::Other(format!("Failed to spawn packet thread: {}", e)))?;

    Ok(ThreadHandles {
        packet: packet_handle,
        log: log_handle,
        radio: radio_handle,
        monitor,
        stats,
    })
}
