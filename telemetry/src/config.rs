//! Configuration for the telemetry daemon
//!
//! Loaded once at startup from a TOML file. Every field has a default so a
//! partial file (or none at all) still yields a flyable configuration.

use crate::error::{Error, Result};
use pygmy_packets::{BlockKind, HEADER_LEN, MAX_BLOCK_PAYLOAD, MAX_PACKET_LEN};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest packet that holds a header and the largest block
pub const MIN_PACKET_LEN: usize = HEADER_LEN + 1 + MAX_BLOCK_PAYLOAD;

/// Slowest sensor rate accepted (one sample per 100 s)
pub const MIN_SENSOR_HZ: f32 = 0.01;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub packet: PacketConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How packets reach the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RadioLinkKind {
    /// Character device accepting one packet per write (e.g. `/dev/rn2903`)
    Device,
    /// Radio module behind a UART
    Serial,
    /// Discard packets (ground testing with logging only)
    Disabled,
}

/// Radio link settings.
///
/// Frequency, bandwidth, preamble, spreading factor, modulation and power
/// are applied by the radio initializer before the daemon starts; they are
/// carried here so a single file describes the station.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadioConfig {
    /// Station callsign stamped on every packet (truncated to 6 bytes)
    #[serde(default = "default_callsign")]
    pub callsign: String,

    #[serde(default = "default_link")]
    pub link: RadioLinkKind,

    /// Device or serial port path
    #[serde(default = "default_radio_path")]
    pub path: String,

    /// Baud rate for `link = "serial"`
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Operating frequency in Hz
    #[serde(default = "default_frequency")]
    pub frequency_hz: u32,

    /// Channel bandwidth in kHz
    #[serde(default = "default_bandwidth")]
    pub bandwidth_khz: u32,

    /// Preamble length in symbols
    #[serde(default = "default_preamble")]
    pub preamble_len: u16,

    /// LoRa spreading factor
    #[serde(default = "default_spread")]
    pub spread_factor: u8,

    /// Modulation (0 = LoRa, 1 = FSK)
    #[serde(default)]
    pub modulation: u8,

    /// Transmit power in dBm
    #[serde(default = "default_tx_power")]
    pub tx_power_dbm: f32,

    /// Consecutive transmit failures before the link is reopened (0 = never)
    #[serde(default = "default_recover_after")]
    pub recover_after: u32,
}

/// Power-safe log storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding `log<N>.bin` files
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,

    /// Rotate to a new file once the next write would exceed this size
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Sync the open file every N packets
    #[serde(default = "default_sync_every")]
    pub sync_every: u32,
}

/// Packet assembly
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacketConfig {
    /// Packet capacity in bytes (at most 255)
    #[serde(default = "default_max_len")]
    pub max_len: usize,

    /// Publish a partly filled packet after this long without sensor data
    #[serde(default = "default_packet_timeout")]
    pub timeout_ms: u64,
}

/// Sensor source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// Synthetic flight profile with noise
    Simulated,
}

/// Sensor sampling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorsConfig {
    #[serde(default = "default_sensor_mode")]
    pub mode: SensorMode,

    #[serde(default = "default_baro_hz")]
    pub baro_hz: f32,

    #[serde(default = "default_imu_hz")]
    pub accel_hz: f32,

    #[serde(default = "default_imu_hz")]
    pub gyro_hz: f32,

    #[serde(default = "default_imu_hz")]
    pub mag_hz: f32,

    /// GNSS fix rate (0 disables the receiver)
    #[serde(default = "default_gnss_hz")]
    pub gnss_hz: f32,

    /// Add one battery block at the start of every packet
    #[serde(default = "default_true")]
    pub battery: bool,

    /// Noise seed (0 = from entropy)
    #[serde(default)]
    pub seed: u64,

    /// Probability that a simulated read fails
    #[serde(default)]
    pub fault_rate: f32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_callsign() -> String {
    "VA3INI".to_string()
}
fn default_link() -> RadioLinkKind {
    RadioLinkKind::Device
}
fn default_radio_path() -> String {
    "/dev/rn2903".to_string()
}
fn default_baud_rate() -> u32 {
    57_600
}
fn default_frequency() -> u32 {
    902_000_000
}
fn default_bandwidth() -> u32 {
    125
}
fn default_preamble() -> u16 {
    6
}
fn default_spread() -> u8 {
    7
}
fn default_tx_power() -> f32 {
    18.0
}
fn default_recover_after() -> u32 {
    5
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("/pwrfs")
}
fn default_max_file_bytes() -> u64 {
    1024 * 1024
}
fn default_sync_every() -> u32 {
    10
}
fn default_max_len() -> usize {
    MAX_PACKET_LEN
}
fn default_packet_timeout() -> u64 {
    500
}
fn default_sensor_mode() -> SensorMode {
    SensorMode::Simulated
}
fn default_baro_hz() -> f32 {
    25.0
}
fn default_imu_hz() -> f32 {
    50.0
}
fn default_gnss_hz() -> f32 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            callsign: default_callsign(),
            link: default_link(),
            path: default_radio_path(),
            baud_rate: default_baud_rate(),
            frequency_hz: default_frequency(),
            bandwidth_khz: default_bandwidth(),
            preamble_len: default_preamble(),
            spread_factor: default_spread(),
            modulation: 0,
            tx_power_dbm: default_tx_power(),
            recover_after: default_recover_after(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            max_file_bytes: default_max_file_bytes(),
            sync_every: default_sync_every(),
        }
    }
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            max_len: default_max_len(),
            timeout_ms: default_packet_timeout(),
        }
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            mode: default_sensor_mode(),
            baro_hz: default_baro_hz(),
            accel_hz: default_imu_hz(),
            gyro_hz: default_imu_hz(),
            mag_hz: default_imu_hz(),
            gnss_hz: default_gnss_hz(),
            battery: true,
            seed: 0,
            fault_rate: 0.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse or validate is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Parse and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        match self.radio.callsign.as_bytes().first() {
            None => return Err(Error::InvalidConfig("radio.callsign is empty".into())),
            // Log files are split where a byte is not a block tag
            Some(&first) if BlockKind::from_tag(first).is_some() => {
                return Err(Error::InvalidConfig(format!(
                    "radio.callsign cannot start with byte {first:#04x}"
                )));
            }
            Some(_) => {}
        }
        if self.packet.max_len < MIN_PACKET_LEN || self.packet.max_len > MAX_PACKET_LEN {
            return Err(Error::InvalidConfig(format!(
                "packet.max_len must be in {}..={}, got {}",
                MIN_PACKET_LEN,
                MAX_PACKET_LEN,
                self.packet.max_len
            )));
        }
        if self.packet.timeout_ms == 0 {
            return Err(Error::InvalidConfig("packet.timeout_ms must be > 0".into()));
        }
        if self.storage.max_file_bytes < self.packet.max_len as u64 {
            return Err(Error::InvalidConfig(format!(
                "storage.max_file_bytes ({}) is smaller than one packet ({})",
                self.storage.max_file_bytes, self.packet.max_len
            )));
        }
        if self.storage.sync_every == 0 {
            return Err(Error::InvalidConfig("storage.sync_every must be > 0".into()));
        }
        let rates = [
            ("baro_hz", self.sensors.baro_hz),
            ("accel_hz", self.sensors.accel_hz),
            ("gyro_hz", self.sensors.gyro_hz),
            ("mag_hz", self.sensors.mag_hz),
        ];
        for (name, hz) in rates {
            if !(hz.is_finite() && hz >= MIN_SENSOR_HZ) {
                return Err(Error::InvalidConfig(format!(
                    "sensors.{name} must be at least {MIN_SENSOR_HZ} Hz, got {hz}"
                )));
            }
        }
        let gnss_hz = self.sensors.gnss_hz;
        if !(gnss_hz == 0.0 || (gnss_hz.is_finite() && gnss_hz >= MIN_SENSOR_HZ)) {
            return Err(Error::InvalidConfig(format!(
                "sensors.gnss_hz must be 0 or at least {MIN_SENSOR_HZ} Hz, got {gnss_hz}"
            )));
        }
        if !(0.0..=1.0).contains(&self.sensors.fault_rate) {
            return Err(Error::InvalidConfig(format!(
                "sensors.fault_rate must be in 0..=1, got {}",
                self.sensors.fault_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.radio.callsign, "VA3INI");
        assert_eq!(config.radio.link, RadioLinkKind::Device);
        assert_eq!(config.radio.frequency_hz, 902_000_000);
        assert_eq!(config.radio.bandwidth_khz, 125);
        assert_eq!(config.radio.spread_factor, 7);
        assert_eq!(config.packet.max_len, 255);
        assert_eq!(config.sensors.baro_hz, 25.0);
        assert_eq!(config.sensors.accel_hz, 50.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[radio]"));
        assert!(toml_string.contains("[storage]"));
        assert!(toml_string.contains("[packet]"));
        assert!(toml_string.contains("[sensors]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("callsign = \"VA3INI\""));
        assert!(toml_string.contains("link = \"device\""));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_content = r#"
[radio]
callsign = "VE3XYZ"
link = "serial"
path = "/dev/ttyUSB0"

[storage]
directory = "/tmp/pygmy"
max_file_bytes = 4096
"#;

        let config = Config::from_toml(toml_content).unwrap();
        assert_eq!(config.radio.callsign, "VE3XYZ");
        assert_eq!(config.radio.link, RadioLinkKind::Serial);
        assert_eq!(config.radio.baud_rate, 57_600);
        assert_eq!(config.storage.directory, PathBuf::from("/tmp/pygmy"));
        assert_eq!(config.storage.max_file_bytes, 4096);
        assert_eq!(config.storage.sync_every, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            "[packet]\nmax_len = 7",
            "[packet]\nmax_len = 19",
            "[packet]\nmax_len = 300",
            "[storage]\nsync_every = 0",
            "[storage]\nmax_file_bytes = 100",
            "[sensors]\nbaro_hz = 0.0",
            "[sensors]\nfault_rate = 1.5",
            "[radio]\ncallsign = \"\"",
            "[radio]\ncallsign = \"\\u0001ABC\"",
            "[sensors]\ngnss_hz = 1e-30",
            "[sensors]\nmag_hz = 1e-9",
            "[sensors]\ngnss_hz = -1.0",
        ];
        for case in cases {
            assert!(
                matches!(Config::from_toml(case), Err(Error::InvalidConfig(_))),
                "accepted: {case}"
            );
        }
    }

    #[test]
    fn test_validation_accepts_limits() {
        let mut config = Config::default();
        config.packet.max_len = MIN_PACKET_LEN;
        config.sensors.baro_hz = MIN_SENSOR_HZ;
        config.sensors.gnss_hz = 0.0;
        config.radio.callsign = "A".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.toml");

        let mut config = Config::default();
        config.radio.callsign = "VA3ZZZ".to_string();
        config.storage.sync_every = 3;
        config.to_file(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.radio.callsign, "VA3ZZZ");
        assert_eq!(loaded.storage.sync_every, 3);
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let config = Config::from_toml(include_str!("../config/telemetry.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(
            toml::to_string(&config).unwrap(),
            toml::to_string(&defaults).unwrap()
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.radio.callsign, "VA3INI");
    }
}
