//! Error types for the telemetry daemon

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Telemetry error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Configuration parsed but holds unusable values
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Current log file reached its size ceiling
    #[error("Log file {seq} full: {size} + {incoming} bytes exceeds {limit}")]
    LogFull {
        /// Sequence number of the full file
        seq: u32,
        /// Bytes already in the file
        size: u64,
        /// Bytes of the rejected write
        incoming: usize,
        /// Configured ceiling
        limit: u64,
    },

    /// Radio accepted fewer bytes than the packet length
    #[error("Short radio write: {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes accepted
        written: usize,
        /// Packet length
        expected: usize,
    },

    /// A sensor failed to produce a reading
    #[error("Sensor {sensor} read failed: {reason}")]
    SensorRead {
        /// Sensor name
        sensor: &'static str,
        /// Failure detail
        reason: String,
    },

    /// Every sensor feed has shut down
    #[error("All sensor feeds closed")]
    SensorsClosed,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
