//! The streaming parser driven over a recorded nmon file.

mod helpers;

use helpers::test_metrics::TestMetrics;
use helpers::{sample_lines, SAMPLE_RECORD_COUNT};
use nmonflux::decoders::RunContext;
use nmonflux::marker::Zone;
use nmonflux::telemetry;
use nmonflux::NmonParser;

fn parser() -> NmonParser {
    NmonParser::new(RunContext::new("db01", "it-run"), "ZZZZ", Zone::utc())
}

fn timestamp(record: &str) -> i64 {
    record.rsplit(' ').next().unwrap().parse().unwrap()
}

#[test]
fn test_sample_decodes_every_snapshot() {
    let mut parser = parser();
    let records: Vec<String> = parser.records(sample_lines()).collect();

    assert_eq!(records.len(), SAMPLE_RECORD_COUNT);
    assert!(parser.discovery_complete());
    assert_eq!(
        parser.registry().prefixes(),
        vec![
            "CPU001", "CPU002", "CPU003", "CPU004", "CPU_ALL", "DISKBUSY", "DISKREAD", "DISKWRITE",
            "MEM"
        ]
    );

    let count = |measurement: &str| {
        records
            .iter()
            .filter(|r| r.starts_with(&format!("{},", measurement)))
            .count()
    };
    assert_eq!(count("cpu-db01"), 15);
    assert_eq!(count("mem-db01"), 3);
    assert_eq!(count("disk-db01"), 27);
}

#[test]
fn test_first_snapshot_records() {
    let mut parser = parser();
    let records: Vec<String> = parser.records(sample_lines()).take(15).collect();

    assert_eq!(
        records[0],
        "cpu-db01,run=it-run,cpus=CPU001 user=3,sys=1,wait=0,idle=96,steal=0 1672567200"
    );
    assert_eq!(
        records[4],
        "cpu-db01,run=it-run,cpus=CPU_ALL user=1.5,sys=0.5,wait=0.3,idle=97.7,steal=0 1672567200"
    );
    assert_eq!(
        records[5],
        "mem-db01,run=it-run memtotal=7838.1,swaptotal=2048,memfree=5120.4,swapfree=2048,memshared=64.2,cached=1690.3,active=1405.8,buffers=120.5,swapcached=0,inactive=823.6 1672567200"
    );
    assert_eq!(
        &records[6..9],
        [
            "disk-db01,run=it-run,disk=sda,mode=busy value=4.7 1672567200",
            "disk-db01,run=it-run,disk=sda1,mode=busy value=0 1672567200",
            "disk-db01,run=it-run,disk=sda2,mode=busy value=4.7 1672567200",
        ]
    );
    assert!(records[9..12].iter().all(|r| r.contains(",mode=read ")));
    assert!(records[12..15].iter().all(|r| r.contains(",mode=write ")));
}

#[test]
fn test_records_carry_their_snapshot_time() {
    let mut parser = parser();
    let stamps: Vec<i64> = parser.records(sample_lines()).map(|r| timestamp(&r)).collect();
    assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(stamps.first(), Some(&1672567200));
    assert_eq!(stamps.last(), Some(&1672567220));
}

#[test]
fn test_corrupted_lines_are_skipped_and_counted() {
    let mut lines = sample_lines();
    let cpu_all = lines
        .iter()
        .position(|l| l.starts_with("CPU_ALL,T0002"))
        .unwrap();
    lines[cpu_all] = "CPU_ALL,T0002,2.8,garbage,0.0,96.2,0.0,,4".to_string();
    let busy = lines
        .iter()
        .position(|l| l.starts_with("DISKBUSY,T0003"))
        .unwrap();
    lines[busy] = "DISKBUSY,T0002,0.0,0.0,0.0".to_string();

    let metrics = TestMetrics::new();
    let records = metrics::with_local_recorder(&metrics, || {
        parser().records(lines).collect::<Vec<_>>()
    });

    assert_eq!(records.len(), SAMPLE_RECORD_COUNT - 1 - 3);
    assert_eq!(metrics.get_counter(telemetry::DECODE_FAILURES), 1);
    assert_eq!(metrics.get_counter(telemetry::PHASE_MISMATCHES), 1);
    assert_eq!(
        metrics.get_counter(telemetry::RECORDS_EMITTED),
        records.len() as u64
    );

    // The failure is attributed to the decoder that rejected the line.
    assert_eq!(
        metrics.label_values(telemetry::DECODE_FAILURES, "decoder"),
        vec!["cpu"]
    );
    assert_eq!(metrics.get_labeled(telemetry::DECODE_FAILURES, "decoder", "cpu"), 1);
    assert_eq!(metrics.get_labeled(telemetry::DECODE_FAILURES, "decoder", "mem"), 0);

    let cpu_records = records.iter().filter(|r| r.starts_with("cpu-db01,")).count();
    assert_eq!(
        metrics.get_labeled(telemetry::RECORDS_EMITTED, "decoder", "cpu"),
        cpu_records as u64
    );
    assert_eq!(metrics.get_labeled(telemetry::RECORDS_EMITTED, "decoder", "mem"), 3);
}

#[test]
fn test_configured_zone_shifts_timestamps() {
    let offset: Zone = "+02:00".parse().unwrap();
    let mut parser = NmonParser::new(RunContext::new("db01", "it-run"), "ZZZZ", offset);
    let first = parser.records(sample_lines()).next().unwrap();
    assert_eq!(timestamp(&first), 1672567200 - 2 * 3600);
}
