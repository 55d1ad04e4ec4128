//! Packet assembly loop
//!
//! Each cycle fills one pre-allocated buffer: header, one battery block,
//! then blocks from whatever sensors are ready until the packet is full or
//! the packet interval runs out. The buffer is then published and the
//! sequence number advanced.
//!
//! # Buffer ownership
//!
//! Buffers are `Arc<Packet>`s allocated once. A buffer is only rewritten when
//! `Arc::get_mut` proves nobody else holds it, so a slow consumer can never
//! see a packet change under it. At most three buffers are referenced from
//! outside at any time (the monitor slot and one per consumer guard), so a
//! pool of four always has a free one and the producer never blocks.

use crate::error::{Error, Result};
use crate::monitor::Monitor;
use crate::sensors::{BatterySource, SensorHub};
use crate::stats::{TelemetryStats, bump};
use pygmy_packets::{Header, Overflow, Packet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Packet buffers owned by the assembler
pub const POOL_SIZE: usize = 4;

struct BufferPool {
    buffers: [Arc<Packet>; POOL_SIZE],
}

impl BufferPool {
    fn new(capacity: usize) -> Self {
        Self {
            buffers: std::array::from_fn(|_| Arc::new(Packet::with_capacity(capacity))),
        }
    }

    /// A buffer nobody else references
    fn checkout(&mut self) -> Option<&mut Arc<Packet>> {
        for buffer in self.buffers.iter_mut() {
            if Arc::get_mut(buffer).is_some() {
                return Some(buffer);
            }
        }
        None
    }
}

enum Finish {
    /// Next block did not fit
    Full,
    /// Packet interval elapsed
    Deadline,
    /// Monitor shut down mid-build
    Shutdown,
}

/// Builds packets from sensor readings and publishes them
pub struct PacketAssembler {
    header: Header,
    hub: Box<dyn SensorHub>,
    battery: Option<Box<dyn BatterySource>>,
    interval: Duration,
    pool: BufferPool,
    monitor: Arc<Monitor>,
    stats: Arc<TelemetryStats>,
}

impl PacketAssembler {
    /// # Arguments
    /// * `callsign` - Station callsign for the header
    /// * `capacity` - Packet size bound in bytes
    /// * `interval` - Longest a partly filled packet waits for more data
    pub fn new(
        callsign: &str,
        capacity: usize,
        interval: Duration,
        hub: Box<dyn SensorHub>,
        monitor: Arc<Monitor>,
        stats: Arc<TelemetryStats>,
    ) -> Self {
        Self {
            header: Header::new(callsign, 0),
            hub,
            battery: None,
            interval,
            pool: BufferPool::new(capacity),
            monitor,
            stats,
        }
    }

    /// Add one battery block at the start of every packet
    pub fn with_battery(mut self, battery: Box<dyn BatterySource>) -> Self {
        self.battery = Some(battery);
        self
    }

    /// Sequence number the next packet will carry
    pub fn sequence(&self) -> u8 {
        self.header.seq()
    }

    /// Assemble and publish until the monitor shuts down
    pub fn run(&mut self) -> Result<()> {
        log::info!(
            "Packet thread started (callsign {:?}, {} ms interval)",
            self.header.callsign_str(),
            self.interval.as_millis()
        );
        while !self.monitor.is_shutdown() {
            self.cycle()?;
        }
        log::info!("Packet thread exiting");
        Ok(())
    }

    /// Build and publish one packet.
    ///
    /// Returns `Ok(false)` if nothing was published (shutdown, or every
    /// buffer still in use).
    pub fn cycle(&mut self) -> Result<bool> {
        let Self {
            header,
            hub,
            battery,
            interval,
            pool,
            monitor,
            stats,
        } = self;

        let Some(slot) = pool.checkout() else {
            log::warn!("All {} packet buffers in use, waiting", POOL_SIZE);
            thread::sleep(Duration::from_millis(1));
            return Ok(false);
        };
        let Some(packet) = Arc::get_mut(slot) else {
            return Ok(false);
        };

        packet.reset();
        packet
            .append_header(header)
            .map_err(|e| Error::Other(format!("Packet cannot hold its header: {e}")))?;

        let mut blocks = 0usize;
        if let Some(battery) = battery.as_deref_mut() {
            match battery.read() {
                Ok(reading) => {
                    let appended = reading.try_for_each_block(|block| packet.push_block(&block));
                    match appended {
                        Ok(()) => {
                            blocks += 1;
                            bump(&stats.blocks_appended);
                        }
                        Err(e) => log::warn!("No room for battery block: {}", e),
                    }
                }
                Err(e) => {
                    log::warn!("Battery read failed: {}", e);
                    bump(&stats.sensor_errors);
                }
            }
        }

        let finish = fill(packet, &mut blocks, &mut **hub, *interval, monitor, stats)?;
        match finish {
            Finish::Shutdown => return Ok(false),
            Finish::Full => log::trace!("Packet {} full at {} bytes", header.seq(), packet.len()),
            Finish::Deadline => log::trace!(
                "Packet {} interval elapsed at {} bytes",
                header.seq(),
                packet.len()
            ),
        }

        log::debug!(
            "Publishing packet {} ({} bytes, {} blocks)",
            header.seq(),
            packet.len(),
            blocks
        );
        monitor.publish(Arc::clone(slot));
        bump(&stats.packets_published);
        header.increment();
        Ok(true)
    }
}

/// Append sensor blocks until the packet fills or the interval runs out.
///
/// A packet holding only its header never times out: it keeps waiting so
/// that empty packets are not published.
fn fill(
    packet: &mut Packet,
    blocks: &mut usize,
    hub: &mut dyn SensorHub,
    interval: Duration,
    monitor: &Monitor,
    stats: &TelemetryStats,
) -> Result<Finish> {
    let mut deadline = Instant::now() + interval;
    loop {
        if monitor.is_shutdown() {
            return Ok(Finish::Shutdown);
        }

        let now = Instant::now();
        if now >= deadline {
            if *blocks > 0 {
                return Ok(Finish::Deadline);
            }
            deadline = now + interval;
        }

        if !hub.wait_ready(deadline - now)? {
            continue;
        }

        while let Some(event) = hub.try_next() {
            let reading = match event {
                Ok(reading) => reading,
                Err(e) => {
                    log::warn!("Skipping sensor read: {}", e);
                    bump(&stats.sensor_errors);
                    continue;
                }
            };
            let appended = reading.try_for_each_block(|block| {
                packet.push_block(&block)?;
                *blocks += 1;
                bump(&stats.blocks_appended);
                Ok::<(), Overflow>(())
            });
            if let Err(overflow) = appended {
                bump(&stats.blocks_dropped);
                if *blocks == 0 {
                    // Would not fit even an empty packet
                    log::warn!("Dropping block larger than packet: {}", overflow);
                    continue;
                }
                log::trace!("Packet full: {}", overflow);
                return Ok(Finish::Full);
            }
        }
    }
}
