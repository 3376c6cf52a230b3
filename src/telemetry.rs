//! # Telemetry
//!
//! Counters describing how the stream is being processed, recorded through the
//! `metrics` facade. Without an installed recorder every call is a no-op, so
//! the parser can record unconditionally.
//!
//! When enabled in the configuration, [`install_exporter`] installs a
//! Prometheus recorder serving a scrape endpoint on the configured address.

use crate::config::MetricsConfig;
use anyhow::{Context, Result};
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

pub const LINES_CAPTURED: &str = "nmon_lines_captured_total";
pub const LINES_FILTERED: &str = "nmon_lines_filtered_total";
pub const RECORDS_EMITTED: &str = "nmon_records_emitted_total";
pub const DECODE_FAILURES: &str = "nmon_decode_failures_total";
pub const PHASE_MISMATCHES: &str = "nmon_phase_mismatches_total";
pub const MARKER_FAILURES: &str = "nmon_marker_failures_total";
pub const RECORDS_WRITTEN: &str = "nmon_records_written_total";
pub const OUTPUT_FAILURES: &str = "nmon_output_failures_total";

/// Registers descriptions for every counter with the global recorder.
pub fn describe() {
    metrics::describe_counter!(LINES_CAPTURED, Unit::Count, "Lines read from the nmon source.");
    metrics::describe_counter!(LINES_FILTERED, Unit::Count, "Lines dropped by the prefix filter before parsing.");
    metrics::describe_counter!(RECORDS_EMITTED, Unit::Count, "Line protocol records produced, labeled by decoder.");
    metrics::describe_counter!(DECODE_FAILURES, Unit::Count, "Data lines skipped because a value failed to decode, labeled by decoder.");
    metrics::describe_counter!(PHASE_MISMATCHES, Unit::Count, "Data lines skipped because their snapshot code did not match the current marker.");
    metrics::describe_counter!(MARKER_FAILURES, Unit::Count, "Timestamp marker lines that failed to parse.");
    metrics::describe_counter!(RECORDS_WRITTEN, Unit::Count, "Records successfully written, labeled by output.");
    metrics::describe_counter!(OUTPUT_FAILURES, Unit::Count, "Records an output failed to write, labeled by output.");
}

/// Installs the Prometheus recorder and its HTTP listener if enabled.
///
/// Must be called from within a Tokio runtime.
pub fn install_exporter(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }
    PrometheusBuilder::new()
        .with_http_listener(config.listen_address)
        .install()
        .with_context(|| {
            format!(
                "failed to install Prometheus exporter on {}",
                config.listen_address
            )
        })?;
    describe();
    info!(address = %config.listen_address, "Prometheus metrics endpoint listening.");
    Ok(())
}

pub fn line_captured() {
    metrics::counter!(LINES_CAPTURED).increment(1);
}

pub fn line_filtered() {
    metrics::counter!(LINES_FILTERED).increment(1);
}

pub fn records_emitted(decoder: &str, count: usize) {
    if count > 0 {
        metrics::counter!(RECORDS_EMITTED, "decoder" => decoder.to_string()).increment(count as u64);
    }
}

pub fn decode_failure(decoder: &str) {
    metrics::counter!(DECODE_FAILURES, "decoder" => decoder.to_string()).increment(1);
}

pub fn phase_mismatch() {
    metrics::counter!(PHASE_MISMATCHES).increment(1);
}

pub fn marker_failure() {
    metrics::counter!(MARKER_FAILURES).increment(1);
}

pub fn record_written(output: &str) {
    metrics::counter!(RECORDS_WRITTEN, "output" => output.to_string()).increment(1);
}

pub fn output_failure(output: &str) {
    metrics::counter!(OUTPUT_FAILURES, "output" => output.to_string()).increment(1);
}
