//! Codec integration tests.
//!
//! Readings are encoded into a packet, read back through the stream splitter
//! and compared against the input values within one quantization step.

use approx::assert_abs_diff_eq;
use pygmy_packets::{
    Block, BlockKind, CALLSIGN_LEN, HEADER_LEN, Header, MAX_PACKET_LEN, Overflow, Packet, scale,
    split_packets,
};

/// Encode `block` into a fresh packet and decode it back out of the bytes
fn through_wire(block: Block) -> Block {
    let mut packet = Packet::new();
    packet.append_header(&Header::new("VA3INI", 0)).unwrap();
    packet.push_block(&block).unwrap();

    let decoded = split_packets(packet.as_bytes()).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].blocks.len(), 1);
    decoded[0].blocks[0]
}

// ============================================================================
// Round trip within quantization
// ============================================================================

#[test]
fn test_pressure_and_temperature_round_trip() {
    for (hpa, celsius) in [(1013.25f32, 15.0f32), (899.87, -12.345), (12.01, 42.0009)] {
        let Block::Pressure { pascals, .. } = through_wire(Block::pressure(0, hpa)) else {
            panic!("expected pressure block");
        };
        assert_abs_diff_eq!(scale::hpa(pascals), hpa, epsilon = 0.01);

        let Block::Temperature { millidegrees, .. } = through_wire(Block::temperature(0, celsius))
        else {
            panic!("expected temperature block");
        };
        assert_abs_diff_eq!(scale::celsius(millidegrees), celsius, epsilon = 0.001);
    }
}

#[test]
fn test_altitude_round_trip() {
    for metres in [0.0f32, 42.0, 1234.5] {
        let hpa = scale::pressure_at_pa(metres) / 100.0;
        let Block::Altitude { centimetres, .. } = through_wire(Block::altitude(0, hpa)) else {
            panic!("expected altitude block");
        };
        assert_abs_diff_eq!(scale::metres(centimetres), metres, epsilon = 0.5);
    }
}

#[test]
fn test_inertial_round_trip() {
    let accel = [0.12f32, -3.5, 9.81];
    let Block::Acceleration { xyz, .. } = through_wire(Block::acceleration(0, accel)) else {
        panic!("expected acceleration block");
    };
    for (wire, expected) in xyz.iter().zip(accel) {
        assert_abs_diff_eq!(scale::accel_m_s2(*wire), expected, epsilon = 0.01);
    }

    let gyro = [0.5f32, -0.01, 2.0];
    let Block::AngularRate { xyz, .. } = through_wire(Block::angular_rate(0, gyro)) else {
        panic!("expected angular rate block");
    };
    // 0.1 deg/s step is ~0.00175 rad/s
    for (wire, expected) in xyz.iter().zip(gyro) {
        assert_abs_diff_eq!(scale::gyro_rad_s(*wire), expected, epsilon = 0.00175);
    }

    let mag = [21.37f32, -4.0, -45.06];
    let Block::MagneticField { xyz, .. } = through_wire(Block::magnetic_field(0, mag)) else {
        panic!("expected magnetic field block");
    };
    for (wire, expected) in xyz.iter().zip(mag) {
        assert_abs_diff_eq!(scale::mag_micro_tesla(*wire), expected, epsilon = 0.1);
    }
}

#[test]
fn test_coordinate_and_battery_round_trip() {
    let (lat, lon) = (43.472_285_1f64, -80.544_858_9f64);
    let Block::Coordinate {
        latitude,
        longitude,
        time_ms,
    } = through_wire(Block::coordinate(98_765_432, lat, lon))
    else {
        panic!("expected coordinate block");
    };
    assert_eq!(time_ms, 98_765);
    assert_abs_diff_eq!(scale::coordinate_degrees(latitude), lat, epsilon = 1e-7);
    assert_abs_diff_eq!(scale::coordinate_degrees(longitude), lon, epsilon = 1e-7);

    let battery = Block::battery(5_000, 4123);
    assert_eq!(through_wire(battery), battery);
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_overflow_boundary_at_protocol_maximum() {
    let mut packet = Packet::new();
    packet.append_header(&Header::new("VA3INI", 0)).unwrap();

    let remaining = MAX_PACKET_LEN - packet.len();
    packet.append(&vec![0x55; remaining]).unwrap();
    assert_eq!(packet.len(), MAX_PACKET_LEN);

    assert_eq!(
        packet.append(&[0x55]),
        Err(Overflow {
            needed: 1,
            remaining: 0
        })
    );
    assert_eq!(packet.len(), MAX_PACKET_LEN);
}

#[test]
fn test_blocks_fill_until_overflow() {
    let mut packet = Packet::new();
    packet.append_header(&Header::new("VA3INI", 7)).unwrap();

    let block = Block::acceleration(1_000, [1.0, 2.0, 3.0]);
    let mut pushed = 0;
    while packet.push_block(&block).is_ok() {
        pushed += 1;
    }

    let per_block = BlockKind::Acceleration.encoded_len();
    assert_eq!(pushed, (MAX_PACKET_LEN - HEADER_LEN) / per_block);
    assert_eq!(packet.len(), HEADER_LEN + pushed * per_block);

    let decoded = split_packets(packet.as_bytes()).unwrap();
    assert_eq!(decoded[0].blocks.len(), pushed);
}

#[test]
fn test_header_never_exceeds_callsign_width() {
    for callsign in ["", "K", "VA3INI", "VA3INI-11-EXTRA"] {
        let header = Header::new(callsign, 0);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), CALLSIGN_LEN + 1);
        let n = callsign.len().min(CALLSIGN_LEN);
        assert_eq!(&bytes[..n], &callsign.as_bytes()[..n]);
        assert!(bytes[n..CALLSIGN_LEN].iter().all(|&b| b == 0));
    }
}
