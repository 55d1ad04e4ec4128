//! Telemetry blocks
//!
//! Each block is one kind tag followed by a fixed-size little-endian payload.
//! Every payload starts with a `u32` mission time in milliseconds.
//!
//! | Kind            | Tag  | Payload after time              | Total payload |
//! |-----------------|------|---------------------------------|---------------|
//! | Pressure        | 0x00 | i32 Pa                          | 8             |
//! | Temperature     | 0x01 | i32 milli-degC                  | 8             |
//! | Altitude        | 0x02 | i32 cm                          | 8             |
//! | Coordinate      | 0x03 | i32 lat, i32 lon (1e-7 deg)     | 12            |
//! | Acceleration    | 0x04 | 3 x i16 cm/s^2                  | 10            |
//! | AngularRate     | 0x05 | 3 x i16 0.1 deg/s               | 10            |
//! | MagneticField   | 0x06 | 3 x i16 0.1 uT                  | 10            |
//! | BatteryVoltage  | 0x07 | u16 mV                          | 6             |

use crate::error::DecodeError;
use std::fmt;

/// Largest payload of any block kind
pub const MAX_BLOCK_PAYLOAD: usize = 12;

/// Physical quantity carried by a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockKind {
    Pressure = 0x00,
    Temperature = 0x01,
    Altitude = 0x02,
    Coordinate = 0x03,
    Acceleration = 0x04,
    AngularRate = 0x05,
    MagneticField = 0x06,
    BatteryVoltage = 0x07,
}

impl BlockKind {
    /// All kinds in tag order
    pub const ALL: [BlockKind; 8] = [
        BlockKind::Pressure,
        BlockKind::Temperature,
        BlockKind::Altitude,
        BlockKind::Coordinate,
        BlockKind::Acceleration,
        BlockKind::AngularRate,
        BlockKind::MagneticField,
        BlockKind::BatteryVoltage,
    ];

    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Kind for a tag byte, `None` if unknown
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(BlockKind::Pressure),
            0x01 => Some(BlockKind::Temperature),
            0x02 => Some(BlockKind::Altitude),
            0x03 => Some(BlockKind::Coordinate),
            0x04 => Some(BlockKind::Acceleration),
            0x05 => Some(BlockKind::AngularRate),
            0x06 => Some(BlockKind::MagneticField),
            0x07 => Some(BlockKind::BatteryVoltage),
            _ => None,
        }
    }

    /// Fixed payload size (excluding the tag byte)
    pub const fn payload_len(self) -> usize {
        match self {
            BlockKind::Pressure | BlockKind::Temperature | BlockKind::Altitude => 8,
            BlockKind::Coordinate => 12,
            BlockKind::Acceleration | BlockKind::AngularRate | BlockKind::MagneticField => 10,
            BlockKind::BatteryVoltage => 6,
        }
    }

    /// Encoded size including the tag byte
    pub const fn encoded_len(self) -> usize {
        1 + self.payload_len()
    }
}

impl TryFrom<u8> for BlockKind {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        BlockKind::from_tag(tag).ok_or(DecodeError::UnknownKind(tag))
    }
}

/// Fixed-point conversions between physical units and wire units.
///
/// Float to integer conversions round to nearest and saturate at the
/// bounds of the wire type (`as` casts saturate, NaN maps to 0).
pub mod scale {
    use std::f32::consts::PI;

    /// Sea-level standard pressure in Pa
    pub const SEA_LEVEL_PA: f32 = 101_325.0;
    /// Barometric formula exponent
    pub const BARO_EXPONENT: f32 = 5.22588;
    /// Barometric formula lapse coefficient (1/m)
    pub const BARO_COEFFICIENT: f32 = 2.255577e-5;

    /// Mission time in ms from a microsecond timestamp (truncating, wraps at 2^32 ms)
    #[inline]
    pub fn mission_ms(timestamp_us: u64) -> u32 {
        (timestamp_us / 1000) as u32
    }

    pub fn pascals(hpa: f32) -> i32 {
        (hpa * 100.0).round() as i32
    }

    pub fn hpa(pascals: i32) -> f32 {
        pascals as f32 / 100.0
    }

    pub fn millidegrees(celsius: f32) -> i32 {
        (celsius * 1000.0).round() as i32
    }

    pub fn celsius(millidegrees: i32) -> f32 {
        millidegrees as f32 / 1000.0
    }

    /// Altitude above the standard sea-level datum in metres.
    ///
    /// `h = (1 - e^(ln(p / p0) / k)) / c`. Accurate to a few metres within
    /// the troposphere.
    pub fn altitude_m(pressure_pa: f32) -> f32 {
        let exponent = (pressure_pa / SEA_LEVEL_PA).ln() / BARO_EXPONENT;
        (1.0 - exponent.exp()) / BARO_COEFFICIENT
    }

    /// Inverse of [`altitude_m`]
    pub fn pressure_at_pa(altitude_m: f32) -> f32 {
        SEA_LEVEL_PA * (1.0 - BARO_COEFFICIENT * altitude_m).powf(BARO_EXPONENT)
    }

    pub fn centimetres(metres: f32) -> i32 {
        (metres * 100.0).round() as i32
    }

    pub fn metres(centimetres: i32) -> f32 {
        centimetres as f32 / 100.0
    }

    /// m/s^2 to cm/s^2
    pub fn accel_wire(m_s2: f32) -> i16 {
        (m_s2 * 100.0).round() as i16
    }

    pub fn accel_m_s2(wire: i16) -> f32 {
        wire as f32 / 100.0
    }

    /// rad/s to 0.1 deg/s
    pub fn gyro_wire(rad_s: f32) -> i16 {
        (rad_s * (180.0 / PI) * 10.0).round() as i16
    }

    pub fn gyro_rad_s(wire: i16) -> f32 {
        wire as f32 / 10.0 * (PI / 180.0)
    }

    /// uT to 0.1 uT
    pub fn mag_wire(micro_tesla: f32) -> i16 {
        (micro_tesla * 10.0).round() as i16
    }

    pub fn mag_micro_tesla(wire: i16) -> f32 {
        wire as f32 / 10.0
    }

    /// Degrees to 1e-7 degree units
    pub fn coordinate_wire(degrees: f64) -> i32 {
        (degrees * 1e7).round() as i32
    }

    pub fn coordinate_degrees(wire: i32) -> f64 {
        wire as f64 / 1e7
    }
}

/// One encoded sensor quantity, in wire units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Pressure { time_ms: u32, pascals: i32 },
    Temperature { time_ms: u32, millidegrees: i32 },
    Altitude { time_ms: u32, centimetres: i32 },
    Coordinate { time_ms: u32, latitude: i32, longitude: i32 },
    Acceleration { time_ms: u32, xyz: [i16; 3] },
    AngularRate { time_ms: u32, xyz: [i16; 3] },
    MagneticField { time_ms: u32, xyz: [i16; 3] },
    BatteryVoltage { time_ms: u32, millivolts: u16 },
}

impl Block {
    /// Pressure block from a reading in hPa
    pub fn pressure(timestamp_us: u64, pressure_hpa: f32) -> Self {
        Block::Pressure {
            time_ms: scale::mission_ms(timestamp_us),
            pascals: scale::pascals(pressure_hpa),
        }
    }

    /// Temperature block from a reading in degC
    pub fn temperature(timestamp_us: u64, celsius: f32) -> Self {
        Block::Temperature {
            time_ms: scale::mission_ms(timestamp_us),
            millidegrees: scale::millidegrees(celsius),
        }
    }

    /// Altitude block derived from a pressure reading in hPa
    pub fn altitude(timestamp_us: u64, pressure_hpa: f32) -> Self {
        let metres = scale::altitude_m(pressure_hpa * 100.0);
        Block::Altitude {
            time_ms: scale::mission_ms(timestamp_us),
            centimetres: scale::centimetres(metres),
        }
    }

    /// Coordinate block from a position in decimal degrees
    pub fn coordinate(timestamp_us: u64, latitude_deg: f64, longitude_deg: f64) -> Self {
        Block::Coordinate {
            time_ms: scale::mission_ms(timestamp_us),
            latitude: scale::coordinate_wire(latitude_deg),
            longitude: scale::coordinate_wire(longitude_deg),
        }
    }

    /// Acceleration block from m/s^2
    pub fn acceleration(timestamp_us: u64, m_s2: [f32; 3]) -> Self {
        Block::Acceleration {
            time_ms: scale::mission_ms(timestamp_us),
            xyz: m_s2.map(scale::accel_wire),
        }
    }

    /// Angular rate block from rad/s
    pub fn angular_rate(timestamp_us: u64, rad_s: [f32; 3]) -> Self {
        Block::AngularRate {
            time_ms: scale::mission_ms(timestamp_us),
            xyz: rad_s.map(scale::gyro_wire),
        }
    }

    /// Magnetic field block from uT
    pub fn magnetic_field(timestamp_us: u64, micro_tesla: [f32; 3]) -> Self {
        Block::MagneticField {
            time_ms: scale::mission_ms(timestamp_us),
            xyz: micro_tesla.map(scale::mag_wire),
        }
    }

    /// Battery block from millivolts
    pub fn battery(timestamp_us: u64, millivolts: u16) -> Self {
        Block::BatteryVoltage {
            time_ms: scale::mission_ms(timestamp_us),
            millivolts,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Pressure { .. } => BlockKind::Pressure,
            Block::Temperature { .. } => BlockKind::Temperature,
            Block::Altitude { .. } => BlockKind::Altitude,
            Block::Coordinate { .. } => BlockKind::Coordinate,
            Block::Acceleration { .. } => BlockKind::Acceleration,
            Block::AngularRate { .. } => BlockKind::AngularRate,
            Block::MagneticField { .. } => BlockKind::MagneticField,
            Block::BatteryVoltage { .. } => BlockKind::BatteryVoltage,
        }
    }

    /// Mission time in milliseconds
    pub fn time_ms(&self) -> u32 {
        match *self {
            Block::Pressure { time_ms, .. }
            | Block::Temperature { time_ms, .. }
            | Block::Altitude { time_ms, .. }
            | Block::Coordinate { time_ms, .. }
            | Block::Acceleration { time_ms, .. }
            | Block::AngularRate { time_ms, .. }
            | Block::MagneticField { time_ms, .. }
            | Block::BatteryVoltage { time_ms, .. } => time_ms,
        }
    }

    /// Write the payload (without tag) into `out`, returning its length.
    ///
    /// `out` must hold at least [`MAX_BLOCK_PAYLOAD`] bytes.
    pub fn encode_payload(&self, out: &mut [u8]) -> usize {
        out[..4].copy_from_slice(&self.time_ms().to_le_bytes());
        match *self {
            Block::Pressure { pascals: v, .. }
            | Block::Temperature { millidegrees: v, .. }
            | Block::Altitude { centimetres: v, .. } => {
                out[4..8].copy_from_slice(&v.to_le_bytes());
            }
            Block::Coordinate {
                latitude,
                longitude,
                ..
            } => {
                out[4..8].copy_from_slice(&latitude.to_le_bytes());
                out[8..12].copy_from_slice(&longitude.to_le_bytes());
            }
            Block::Acceleration { xyz, .. }
            | Block::AngularRate { xyz, .. }
            | Block::MagneticField { xyz, .. } => {
                for (i, axis) in xyz.iter().enumerate() {
                    let at = 4 + i * 2;
                    out[at..at + 2].copy_from_slice(&axis.to_le_bytes());
                }
            }
            Block::BatteryVoltage { millivolts, .. } => {
                out[4..6].copy_from_slice(&millivolts.to_le_bytes());
            }
        }
        self.kind().payload_len()
    }

    /// Decode a payload of the given kind
    pub fn decode(kind: BlockKind, payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() != kind.payload_len() {
            return Err(DecodeError::PayloadLength {
                kind: kind.tag(),
                expected: kind.payload_len(),
                actual: payload.len(),
            });
        }
        let u32_at = |at: usize| {
            u32::from_le_bytes([
                payload[at],
                payload[at + 1],
                payload[at + 2],
                payload[at + 3],
            ])
        };
        let i32_at = |at: usize| u32_at(at) as i32;
        let i16_at = |at: usize| i16::from_le_bytes([payload[at], payload[at + 1]]);
        let axes = || [i16_at(4), i16_at(6), i16_at(8)];
        let time_ms = u32_at(0);

        Ok(match kind {
            BlockKind::Pressure => Block::Pressure {
                time_ms,
                pascals: i32_at(4),
            },
            BlockKind::Temperature => Block::Temperature {
                time_ms,
                millidegrees: i32_at(4),
            },
            BlockKind::Altitude => Block::Altitude {
                time_ms,
                centimetres: i32_at(4),
            },
            BlockKind::Coordinate => Block::Coordinate {
                time_ms,
                latitude: i32_at(4),
                longitude: i32_at(8),
            },
            BlockKind::Acceleration => Block::Acceleration {
                time_ms,
                xyz: axes(),
            },
            BlockKind::AngularRate => Block::AngularRate {
                time_ms,
                xyz: axes(),
            },
            BlockKind::MagneticField => Block::MagneticField {
                time_ms,
                xyz: axes(),
            },
            BlockKind::BatteryVoltage => Block::BatteryVoltage {
                time_ms,
                millivolts: u16::from_le_bytes([payload[4], payload[5]]),
            },
        })
    }

    /// Decode a tagged block from the start of `bytes`.
    ///
    /// Returns the block and the number of bytes consumed.
    pub fn decode_tagged(bytes: &[u8]) -> Result<(Self, usize), DecodeError> {
        let Some(&tag) = bytes.first() else {
            return Err(DecodeError::Truncated {
                what: "block",
                needed: 1,
                available: 0,
            });
        };
        let kind = BlockKind::try_from(tag)?;
        let end = kind.encoded_len();
        if bytes.len() < end {
            return Err(DecodeError::Truncated {
                what: "block",
                needed: end,
                available: bytes.len(),
            });
        }
        Ok((Block::decode(kind, &bytes[1..end])?, end))
    }
}

impl fmt::Display for Block {
    /// Physical units, e.g. `[  12345 ms] pressure 1013.25 hPa`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>9} ms] ", self.time_ms())?;
        match *self {
            Block::Pressure { pascals, .. } => {
                write!(f, "pressure {:.2} hPa", scale::hpa(pascals))
            }
            Block::Temperature { millidegrees, .. } => {
                write!(f, "temperature {:.3} C", scale::celsius(millidegrees))
            }
            Block::Altitude { centimetres, .. } => {
                write!(f, "altitude {:.2} m", scale::metres(centimetres))
            }
            Block::Coordinate {
                latitude,
                longitude,
                ..
            } => write!(
                f,
                "position {:.7}, {:.7}",
                scale::coordinate_degrees(latitude),
                scale::coordinate_degrees(longitude)
            ),
            Block::Acceleration { xyz, .. } => {
                let [x, y, z] = xyz.map(scale::accel_m_s2);
                write!(f, "accel {x:.2} {y:.2} {z:.2} m/s^2")
            }
            Block::AngularRate { xyz, .. } => {
                let [x, y, z] = xyz.map(|v| v as f32 / 10.0);
                write!(f, "gyro {x:.1} {y:.1} {z:.1} deg/s")
            }
            Block::MagneticField { xyz, .. } => {
                let [x, y, z] = xyz.map(scale::mag_micro_tesla);
                write!(f, "mag {x:.1} {y:.1} {z:.1} uT")
            }
            Block::BatteryVoltage { millivolts, .. } => {
                write!(f, "battery {millivolts} mV")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_tags_are_stable() {
        for (i, kind) in BlockKind::ALL.iter().enumerate() {
            assert_eq!(kind.tag() as usize, i);
            assert_eq!(BlockKind::from_tag(i as u8), Some(*kind));
        }
        assert_eq!(BlockKind::from_tag(0x08), None);
        assert_eq!(BlockKind::try_from(0x41), Err(DecodeError::UnknownKind(0x41)));
    }

    #[test]
    fn test_payload_lengths_fit_max() {
        for kind in BlockKind::ALL {
            assert!(kind.payload_len() <= MAX_BLOCK_PAYLOAD);
        }
    }

    #[test]
    fn test_mission_time_truncates() {
        assert_eq!(scale::mission_ms(0), 0);
        assert_eq!(scale::mission_ms(1_999), 1);
        assert_eq!(scale::mission_ms(12_345_678), 12_345);
    }

    #[test]
    fn test_pressure_scaling() {
        let block = Block::pressure(0, 1013.25);
        assert_eq!(
            block,
            Block::Pressure {
                time_ms: 0,
                pascals: 101_325
            }
        );
    }

    #[test]
    fn test_gyro_scaling() {
        // 1 rad/s = 57.2958 deg/s -> 573 in 0.1 deg/s
        let block = Block::angular_rate(0, [1.0, -1.0, 0.0]);
        assert_eq!(
            block,
            Block::AngularRate {
                time_ms: 0,
                xyz: [573, -573, 0]
            }
        );
    }

    #[test]
    fn test_altitude_at_sea_level_is_zero() {
        assert_abs_diff_eq!(scale::altitude_m(scale::SEA_LEVEL_PA), 0.0, epsilon = 1e-3);
        let block = Block::altitude(0, 1013.25);
        assert_eq!(
            block,
            Block::Altitude {
                time_ms: 0,
                centimetres: 0
            }
        );
    }

    #[test]
    fn test_altitude_inverse() {
        for metres in [0.0f32, 150.0, 1000.0, 3000.0] {
            let p = scale::pressure_at_pa(metres);
            assert_abs_diff_eq!(scale::altitude_m(p), metres, epsilon = 0.5);
        }
    }

    #[test]
    fn test_saturating_conversion() {
        let block = Block::acceleration(0, [1000.0, -1000.0, f32::NAN]);
        assert_eq!(
            block,
            Block::Acceleration {
                time_ms: 0,
                xyz: [i16::MAX, i16::MIN, 0]
            }
        );
    }

    #[test]
    fn test_decode_wrong_length() {
        let err = Block::decode(BlockKind::Coordinate, &[0; 8]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PayloadLength {
                kind: 0x03,
                expected: 12,
                actual: 8
            }
        );
    }

    #[test]
    fn test_decode_tagged_truncated() {
        let err = Block::decode_tagged(&[0x04, 1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                what: "block",
                needed: 11,
                available: 4
            }
        ));
    }

    #[test]
    fn test_display() {
        let block = Block::battery(4_200_000, 3912);
        assert_eq!(block.to_string(), "[     4200 ms] battery 3912 mV");
    }
}
