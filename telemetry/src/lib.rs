//! Pygmy telemetry daemon
//!
//! Collects sensor readings into bounded packets (see [`pygmy_packets`]),
//! appends every packet to power-safe storage and sends it down the radio
//! link. The three loops live in [`threads`]; they share exactly one
//! published packet at a time through the [`Monitor`].
//!
//! Storage, radio and sensors are reached through small traits
//! ([`storage::LogStorage`], [`radio::RadioTransport`],
//! [`sensors::SensorHub`]) so the pipeline runs the same against real
//! devices, simulators and in-memory mocks.

pub mod config;
pub mod error;
pub mod monitor;
pub mod radio;
pub mod sensors;
pub mod stats;
pub mod storage;
pub mod threads;

pub use config::Config;
pub use error::{Error, Result};
pub use monitor::{ConsumeGuard, Monitor, Role};
pub use stats::{StatsSnapshot, TelemetryStats};
pub use threads::{PipelineExit, PipelineHealth, ThreadHandles, spawn_threads};
