#![allow(dead_code)]
//! Shared test helpers: in-memory sources and outputs, a counting metrics
//! recorder, and access to the recorded nmon sample.

pub mod mock_output;
pub mod mock_source;
pub mod test_metrics;

use std::path::PathBuf;

/// Path to a realistic nmon recording: three snapshots of a 4-CPU host with
/// three block devices, plus the categories nmonflux ignores.
pub fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/sample_nmon_output.csv")
}

pub fn sample_lines() -> Vec<String> {
    std::fs::read_to_string(sample_path())
        .expect("sample nmon output is readable")
        .lines()
        .map(str::to_string)
        .collect()
}

/// Records the sample decodes to: per snapshot, 5 CPU lines, 1 MEM line and
/// 3 disk tables of 3 devices.
pub const SAMPLE_RECORD_COUNT: usize = 3 * (5 + 1 + 3 * 3);
