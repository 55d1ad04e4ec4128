//! End-to-end tests: sensor readings in, log files and radio frames out.

mod common;

use common::{
    ACCEL_PACKET_LEN, run_packets, run_packets_for, start, test_config, wait_until_finished,
};
use pygmy_packets::{BlockKind, split_packets};
use pygmy_telemetry::radio::{MockRadio, RadioTransport};
use pygmy_telemetry::sensors::sim::SimBattery;
use pygmy_telemetry::sensors::{ChannelSensorHub, MissionClock};
use pygmy_telemetry::{Error, PipelineHealth, Result, Role, spawn_threads};
use pygmy_telemetry::storage::{DirStorage, LogStorage, MemoryStorage};
use std::fs;

#[test]
fn test_ten_packets_logged_and_transmitted_in_order() {
    let storage = MemoryStorage::new(1 << 20);
    let radio = MockRadio::new();
    let (handles, feed) = start(&test_config(), storage.clone(), &radio);

    run_packets(&handles, &feed, 10);
    handles.shutdown();
    let exit = handles.join();
    assert!(exit.is_clean(), "failed: {:?}", exit.failed);
    let stats = exit.stats;

    let log = storage.file(0).expect("log0.bin");
    assert_eq!(log.len(), 10 * ACCEL_PACKET_LEN);

    let packets = split_packets(&log).unwrap();
    assert_eq!(packets.len(), 10);
    for (i, packet) in packets.iter().enumerate() {
        assert_eq!(packet.header.callsign(), b"VA3INI");
        assert_eq!(packet.header.seq(), i as u8);
        assert_eq!(packet.blocks.len(), 1);
        assert_eq!(packet.blocks[0].kind(), BlockKind::Acceleration);
        assert_eq!(packet.blocks[0].time_ms(), i as u32 * 100);
    }

    let frames = radio.frames();
    assert_eq!(frames.len(), 10);
    for (frame, packet) in frames.iter().zip(&packets) {
        assert_eq!(frame.as_slice(), packet.raw);
    }

    assert_eq!(stats.packets_published, 10);
    assert_eq!(stats.packets_logged, 10);
    assert_eq!(stats.packets_transmitted, 10);
}

#[test]
fn test_transmit_failures_do_not_reach_the_log() {
    let storage = MemoryStorage::new(1 << 20);
    let radio = MockRadio::new();
    radio.fail_next(3);
    let (handles, feed) = start(&test_config(), storage.clone(), &radio);

    run_packets(&handles, &feed, 6);
    handles.shutdown();
    let stats = handles.join().stats;

    let file0 = storage.file(0).unwrap();
    let logged = split_packets(&file0).unwrap();
    let seqs: Vec<u8> = logged.iter().map(|p| p.header.seq()).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4, 5]);

    // First three were attempted and lost; the rest went out
    assert_eq!(radio.attempts(), 6);
    let sent: Vec<u8> = radio.frames().iter().map(|f| f[6]).collect();
    assert_eq!(sent, vec![3, 4, 5]);
    assert_eq!(stats.transmit_errors, 3);
    assert_eq!(stats.log_errors, 0);
}

#[test]
fn test_rotation_keeps_every_byte() {
    let dir = tempfile::tempdir().unwrap();
    // Two packets per file
    let storage = DirStorage::open(dir.path(), 2 * ACCEL_PACKET_LEN as u64 + 5).unwrap();
    let radio = MockRadio::new();
    let (handles, feed) = start(&test_config(), storage, &radio);

    run_packets(&handles, &feed, 10);
    handles.shutdown();
    let stats = handles.join().stats;

    let mut logged = Vec::new();
    for seq in 0..5 {
        let bytes = fs::read(dir.path().join(format!("log{}.bin", seq))).unwrap();
        assert_eq!(bytes.len(), 2 * ACCEL_PACKET_LEN, "log{}.bin", seq);
        logged.extend(bytes);
    }
    assert!(!dir.path().join("log5.bin").exists());

    let transmitted: Vec<u8> = radio.frames().concat();
    assert_eq!(logged, transmitted);
    assert_eq!(stats.log_rotations, 4);
    assert_eq!(stats.log_errors, 0);
}

#[test]
fn test_logging_resumes_after_newest_file() {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in [
        ("log0.bin", "old"),
        ("log3.bin", "older"),
        ("log7.bin", "newest"),
        ("notes.txt", "ignored"),
    ] {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    let storage = DirStorage::open(dir.path(), 1 << 20).unwrap();
    let radio = MockRadio::new();
    let (handles, feed) = start(&test_config(), storage, &radio);

    run_packets(&handles, &feed, 1);
    handles.shutdown();
    handles.join();

    assert_eq!(fs::read(dir.path().join("log7.bin")).unwrap(), b"newest");
    let resumed = fs::read(dir.path().join("log8.bin")).unwrap();
    let packets = split_packets(&resumed).unwrap();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].header.seq(), 0);
}

#[test]
fn test_battery_block_leads_each_packet() {
    let storage = MemoryStorage::new(1 << 20);
    let radio = MockRadio::new();
    let (hub, feed) = ChannelSensorHub::new(64);
    let battery = SimBattery::new(MissionClock::start(), 42, 0.0);

    let log_storage = storage.clone();
    let tx_radio = radio.clone();
    let handles = spawn_threads(
        &test_config(),
        Box::new(hub),
        Some(Box::new(battery)),
        move || Ok(Box::new(log_storage) as Box<dyn LogStorage>),
        move || Ok(Box::new(tx_radio) as Box<dyn RadioTransport>),
    )
    .unwrap();

    run_packets(&handles, &feed, 3);
    handles.shutdown();
    handles.join();

    let file0 = storage.file(0).unwrap();
    let packets = split_packets(&file0).unwrap();
    assert_eq!(packets.len(), 3);
    for packet in &packets {
        let kinds: Vec<_> = packet.blocks.iter().map(|b| b.kind()).collect();
        assert_eq!(kinds, vec![BlockKind::BatteryVoltage, BlockKind::Acceleration]);
    }
}

#[test]
fn test_logging_continues_without_radio() {
    let storage = MemoryStorage::new(1 << 20);
    let (hub, feed) = ChannelSensorHub::new(64);
    let log_storage = storage.clone();
    let handles = spawn_threads(
        &test_config(),
        Box::new(hub),
        None,
        move || Ok(Box::new(log_storage) as Box<dyn LogStorage>),
        || -> Result<Box<dyn RadioTransport>> { Err(Error::Other("no radio".into())) },
    )
    .unwrap();

    wait_until_finished(&handles.radio);
    run_packets_for(&handles, &feed, 5, Role::Logger);
    assert_eq!(handles.health(), PipelineHealth::Degraded);
    assert_eq!(handles.finished(), vec!["radio"]);

    handles.shutdown();
    let exit = handles.join();
    assert_eq!(exit.failed, vec!["radio"]);
    assert_eq!(exit.stats.packets_logged, 5);
    assert_eq!(exit.stats.packets_transmitted, 0);

    let file0 = storage.file(0).unwrap();
    let packets = split_packets(&file0).unwrap();
    let seqs: Vec<u8> = packets.iter().map(|p| p.header.seq()).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_radio_continues_without_storage() {
    let radio = MockRadio::new();
    let (hub, feed) = ChannelSensorHub::new(64);
    let tx_radio = radio.clone();
    let handles = spawn_threads(
        &test_config(),
        Box::new(hub),
        None,
        || -> Result<Box<dyn LogStorage>> { Err(Error::Other("no storage".into())) },
        move || Ok(Box::new(tx_radio) as Box<dyn RadioTransport>),
    )
    .unwrap();

    wait_until_finished(&handles.log);
    run_packets_for(&handles, &feed, 5, Role::Radio);
    assert_eq!(handles.health(), PipelineHealth::Degraded);

    handles.shutdown();
    let exit = handles.join();
    assert_eq!(exit.failed, vec!["log"]);
    assert_eq!(exit.stats.packets_transmitted, 5);
    assert_eq!(exit.stats.packets_logged, 0);

    let sent: Vec<u8> = radio.frames().iter().map(|f| f[6]).collect();
    assert_eq!(sent, vec![0, 1, 2, 3, 4]);
}
