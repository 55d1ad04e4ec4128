//! Sensor capability consumed by the packet assembler
//!
//! Drivers are outside this crate. Whatever produces readings pushes
//! [`SensorEvent`]s into a [`ChannelSensorHub`]; the assembler only sees the
//! [`SensorHub`] trait and waits on all sources at once.

mod hub;
pub mod sim;

pub use hub::{ChannelSensorHub, SensorFeed};

use crate::error::Result;
use pygmy_packets::Block;
use std::time::{Duration, Instant};

/// One typed reading from a sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Barometer: pressure in hPa and die temperature in degC
    Baro {
        timestamp_us: u64,
        pressure_hpa: f32,
        temperature_c: f32,
    },
    /// Accelerometer in m/s^2
    Accel { timestamp_us: u64, m_s2: [f32; 3] },
    /// Gyroscope in rad/s
    Gyro { timestamp_us: u64, rad_s: [f32; 3] },
    /// Magnetometer in uT
    Mag {
        timestamp_us: u64,
        micro_tesla: [f32; 3],
    },
    /// Battery voltage in mV
    Battery { timestamp_us: u64, millivolts: u16 },
    /// GNSS position in decimal degrees
    Gnss {
        timestamp_us: u64,
        latitude_deg: f64,
        longitude_deg: f64,
    },
}

/// A reading, or the error a sensor raised instead
pub type SensorEvent = Result<Reading>;

impl Reading {
    pub fn timestamp_us(&self) -> u64 {
        match *self {
            Reading::Baro { timestamp_us, .. }
            | Reading::Accel { timestamp_us, .. }
            | Reading::Gyro { timestamp_us, .. }
            | Reading::Mag { timestamp_us, .. }
            | Reading::Battery { timestamp_us, .. }
            | Reading::Gnss { timestamp_us, .. } => timestamp_us,
        }
    }

    /// Hand each block this reading encodes to `f`, stopping at the first error.
    ///
    /// A barometer reading yields pressure, temperature and altitude; every
    /// other reading yields exactly one block of its own kind.
    pub fn try_for_each_block<E>(
        &self,
        mut f: impl FnMut(Block) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        match *self {
            Reading::Baro {
                timestamp_us,
                pressure_hpa,
                temperature_c,
            } => {
                f(Block::pressure(timestamp_us, pressure_hpa))?;
                f(Block::temperature(timestamp_us, temperature_c))?;
                f(Block::altitude(timestamp_us, pressure_hpa))
            }
            Reading::Accel { timestamp_us, m_s2 } => f(Block::acceleration(timestamp_us, m_s2)),
            Reading::Gyro {
                timestamp_us,
                rad_s,
            } => f(Block::angular_rate(timestamp_us, rad_s)),
            Reading::Mag {
                timestamp_us,
                micro_tesla,
            } => f(Block::magnetic_field(timestamp_us, micro_tesla)),
            Reading::Battery {
                timestamp_us,
                millivolts,
            } => f(Block::battery(timestamp_us, millivolts)),
            Reading::Gnss {
                timestamp_us,
                latitude_deg,
                longitude_deg,
            } => f(Block::coordinate(timestamp_us, latitude_deg, longitude_deg)),
        }
    }
}

/// Aggregate source of sensor readings
pub trait SensorHub: Send {
    /// Block until at least one reading is available or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout and an error once no source can ever
    /// produce data again.
    fn wait_ready(&mut self, timeout: Duration) -> Result<bool>;

    /// Next reading that is already available, without blocking
    fn try_next(&mut self) -> Option<SensorEvent>;
}

/// Battery measurement taken once per packet
pub trait BatterySource: Send {
    fn read(&mut self) -> Result<Reading>;
}

/// Convert a raw battery ADC sample to millivolts.
///
/// The sample carries a 15-bit conversion in its upper half-word against a
/// 4.3 V full scale.
pub fn adc_to_millivolts(raw: u32) -> u16 {
    ((4300 * (raw >> 16)) / 32768) as u16
}

/// Microseconds since the flight computer booted
#[derive(Debug, Clone, Copy)]
pub struct MissionClock {
    boot: Instant,
}

impl MissionClock {
    pub fn start() -> Self {
        Self {
            boot: Instant::now(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.boot.elapsed().as_micros() as u64
    }
}
