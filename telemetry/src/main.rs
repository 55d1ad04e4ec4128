//! Pygmy telemetry daemon
//!
//! Starts the sensor sources, then the packet, log and radio threads, and
//! runs until Ctrl-C or until no packets can flow. A failed log or radio
//! thread leaves the other one running; any thread failure makes the exit
//! status non-zero.

use pygmy_telemetry::config::{Config, SensorMode};
use pygmy_telemetry::error::{Error, Result};
use pygmy_telemetry::radio::{self, RadioTransport};
use pygmy_telemetry::sensors::{BatterySource, ChannelSensorHub, MissionClock, sim};
use pygmy_telemetry::storage::{DirStorage, LogStorage};
use pygmy_telemetry::threads::{PipelineHealth, spawn_threads};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Readings buffered between the sensor threads and the packet thread
const SENSOR_QUEUE_DEPTH: usize = 256;

/// How often running counters are logged
const STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Parse config path from command line arguments.
///
/// Supports:
/// - `pygmy-telemetry <path>` (positional)
/// - `pygmy-telemetry --config <path>` (flag-based)
/// - `pygmy-telemetry -c <path>` (short flag)
///
/// Defaults to `/etc/pygmy/telemetry.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/pygmy/telemetry.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = Config::load(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Pygmy telemetry v{} starting...", env!("CARGO_PKG_VERSION"));
    if Path::new(&config_path).exists() {
        log::info!("Using config: {}", config_path);
    } else {
        log::warn!("Config {} not found, running with defaults", config_path);
    }
    log::info!(
        "Callsign {}, packets up to {} bytes every {} ms",
        config.radio.callsign,
        config.packet.max_len,
        config.packet.timeout_ms
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Sensors stop after the pipeline so the packet thread never sees them close
    let sensors_running = Arc::new(AtomicBool::new(true));
    let clock = MissionClock::start();
    let (hub, feed) = ChannelSensorHub::new(SENSOR_QUEUE_DEPTH);
    let sensor_threads = match config.sensors.mode {
        SensorMode::Simulated => {
            log::info!("Sensors: simulated flight profile");
            sim::spawn_simulated(&config.sensors, clock, &feed, Arc::clone(&sensors_running))?
        }
    };
    // Only the sensor threads hold senders now; the hub closes when they exit
    drop(feed);

    let battery: Option<Box<dyn BatterySource>> = if config.sensors.battery {
        let seed = match config.sensors.seed {
            0 => 0,
            seed => seed.wrapping_add(6),
        };
        Some(Box::new(sim::SimBattery::new(
            clock,
            seed,
            config.sensors.fault_rate,
        )))
    } else {
        None
    };

    // Pipeline
    let storage_config = config.storage.clone();
    let radio_config = config.radio.clone();
    let handles = spawn_threads(
        &config,
        Box::new(hub),
        battery,
        move || {
            let storage =
                DirStorage::open(&storage_config.directory, storage_config.max_file_bytes)?;
            Ok(Box::new(storage) as Box<dyn LogStorage>)
        },
        move || -> Result<Box<dyn RadioTransport>> { radio::open_radio(&radio_config) },
    )?;

    log::info!("Telemetry pipeline running");

    let mut last_stats = Instant::now();
    let mut degraded = false;
    while running.load(Ordering::Relaxed) {
        match handles.health() {
            PipelineHealth::Running => {}
            PipelineHealth::Degraded => {
                if !degraded {
                    log::warn!(
                        "Running degraded, stopped: {}",
                        handles.finished().join(", ")
                    );
                    degraded = true;
                }
            }
            PipelineHealth::Stopped => {
                log::error!(
                    "Pipeline cannot continue, stopped: {}",
                    handles.finished().join(", ")
                );
                break;
            }
        }
        if last_stats.elapsed() >= STATS_INTERVAL {
            log::info!("{}", handles.stats.snapshot());
            last_stats = Instant::now();
        }
        thread::sleep(Duration::from_millis(100));
    }

    log::info!("Shutting down...");
    handles.shutdown();
    let exit = handles.join();

    sensors_running.store(false, Ordering::Relaxed);
    for handle in sensor_threads {
        if handle.join().is_err() {
            log::error!("Sensor thread panicked");
        }
    }

    log::info!("Final: {}", exit.stats);
    if !exit.is_clean() {
        return Err(Error::Other(format!(
            "Pipeline threads failed: {}",
            exit.failed.join(", ")
        )));
    }
    log::info!("Pygmy telemetry stopped");
    Ok(())
}
