//! Test utilities for running the full pipeline.

#![allow(dead_code)]

use pygmy_telemetry::radio::{MockRadio, RadioTransport};
use pygmy_telemetry::sensors::{ChannelSensorHub, Reading, SensorFeed};
use pygmy_telemetry::storage::LogStorage;
use pygmy_telemetry::{Config, Monitor, Role, ThreadHandles, spawn_threads};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Header plus one acceleration block
pub const ACCEL_PACKET_LEN: usize = 7 + 1 + 10;

/// Defaults with a short packet interval and no battery block
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.packet.timeout_ms = 10;
    config.sensors.battery = false;
    config
}

pub fn accel(t_ms: u64) -> Reading {
    Reading::Accel {
        timestamp_us: t_ms * 1_000,
        m_s2: [0.1, -0.2, 9.81],
    }
}

/// Start the pipeline against the given storage and a mock radio
pub fn start<S>(config: &Config, storage: S, radio: &MockRadio) -> (ThreadHandles, SensorFeed)
where
    S: LogStorage + 'static,
{
    let (hub, feed) = ChannelSensorHub::new(64);
    let radio = radio.clone();
    let handles = spawn_threads(
        config,
        Box::new(hub),
        None,
        move || Ok(Box::new(storage) as Box<dyn LogStorage>),
        move || Ok(Box::new(radio) as Box<dyn RadioTransport>),
    )
    .expect("spawn pipeline");
    (handles, feed)
}

/// Block until `n` packets have been published
pub fn wait_for_generation(monitor: &Monitor, n: u64) {
    let deadline = Instant::now() + TIMEOUT;
    while monitor.generation() < n {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for packet {} (at {})",
            n,
            monitor.generation()
        );
        thread::sleep(Duration::from_millis(1));
    }
}

/// Feed one reading per packet and wait for both consumers after each.
///
/// Returns once `count` packets have been logged and transmitted.
pub fn run_packets(handles: &ThreadHandles, feed: &SensorFeed, count: u64) {
    let start = handles.monitor.generation();
    for i in 0..count {
        assert!(feed.push(Ok(accel(i * 100))));
        wait_for_generation(&handles.monitor, start + i + 1);
        assert!(
            handles.monitor.wait_idle(TIMEOUT),
            "consumers did not finish packet {}",
            i
        );
    }
}

/// Like [`run_packets`], but only wait for `role`, for runs with one
/// consumer down
pub fn run_packets_for(handles: &ThreadHandles, feed: &SensorFeed, count: u64, role: Role) {
    let start = handles.monitor.generation();
    for i in 0..count {
        assert!(feed.push(Ok(accel(i * 100))));
        wait_for_generation(&handles.monitor, start + i + 1);
        let deadline = Instant::now() + TIMEOUT;
        while !handles.monitor.is_consumed(role) {
            assert!(
                Instant::now() < deadline,
                "{:?} did not finish packet {}",
                role,
                i
            );
            thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Block until a pipeline thread has ended
pub fn wait_until_finished(handle: &JoinHandle<pygmy_telemetry::Result<()>>) {
    let deadline = Instant::now() + TIMEOUT;
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "thread still running");
        thread::sleep(Duration::from_millis(1));
    }
}
