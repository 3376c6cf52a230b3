//! Metric decoders turning nmon data lines into line protocol records.
//!
//! Each decoder is built once, during header discovery, with the host-specific
//! parameters it needs (CPU identifier, disk device list). At dispatch time it
//! receives the fields following the line prefix and the current marker.
//!
//! Every decoder is wrapped by [`Decoder::decode`], which applies the guards
//! shared by all variants: no output without a marker, no output for a line
//! whose snapshot code differs from the marker's, and no output (plus a
//! warning) when a value fails to parse. A bad line never ends the stream.

pub mod cpu;
pub mod disk;
pub mod memory;

pub use cpu::CpuDecoder;
pub use disk::{DiskDecoder, DiskMode};
pub use memory::MemoryDecoder;

use crate::line_protocol::Precision;
use crate::marker::Marker;
use crate::telemetry;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{trace, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("expected at least {expected} values, found {found}")]
    MissingFields { expected: usize, found: usize },

    #[error("invalid value {value:?} for field {field}")]
    InvalidNumber { field: String, value: String },

    #[error("non-finite value for field {field}")]
    NonFinite { field: String },
}

/// Parameters shared by every decoder of one capture run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    /// Base measurement name; decoders prefix it with their category
    /// (`cpu-`, `mem-`, `disk-`).
    pub measurement: String,
    /// Opaque identifier tagged onto every record of the run.
    pub run_id: String,
    pub precision: Precision,
}

impl RunContext {
    pub fn new(measurement: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            run_id: run_id.into(),
            precision: Precision::default(),
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    fn measurement_for(&self, category: &str) -> String {
        format!("{}-{}", category, self.measurement)
    }
}

/// The per-variant decoding step, run once the shared guards have passed.
pub trait MetricDecoder: fmt::Debug + Send + Sync {
    /// A short name used in logs and metric labels (e.g. `cpu`, `disk-busy`).
    fn name(&self) -> &str;

    /// Decodes the values following the snapshot code.
    ///
    /// # Arguments
    /// * `values` - the comma-separated values after the leading index field
    /// * `marker` - the marker whose code matched the line's index
    fn decode_values(&self, values: &str, marker: &Marker) -> Result<Vec<String>, DecodeError>;
}

/// A registered decoder. Cheap to clone; the variant is shared.
#[derive(Debug, Clone)]
pub struct Decoder {
    inner: Arc<dyn MetricDecoder>,
}

impl Decoder {
    pub fn new(inner: impl MetricDecoder + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn cpu(context: &RunContext, cpu_id: &str) -> Self {
        Self::new(CpuDecoder::new(context, cpu_id))
    }

    pub fn memory(context: &RunContext) -> Self {
        Self::new(MemoryDecoder::new(context))
    }

    pub fn disk(context: &RunContext, devices: Arc<[String]>, mode: DiskMode) -> Self {
        Self::new(DiskDecoder::new(context, devices, mode))
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Decodes the fields of one data line (everything after its prefix).
    ///
    /// Returns no records when `marker` is absent, when the line's leading
    /// index differs from the marker code, or when decoding fails.
    pub fn decode(&self, fields: &str, marker: Option<&Marker>) -> Vec<String> {
        let Some(marker) = marker else {
            trace!(decoder = self.name(), "No marker seen yet, skipping line.");
            return Vec::new();
        };
        let (index, values) = split_first(fields);
        if index != marker.code {
            trace!(
                decoder = self.name(),
                index,
                marker = %marker.code,
                "Line is out of phase with the current marker, skipping."
            );
            telemetry::phase_mismatch();
            return Vec::new();
        }
        match self.inner.decode_values(values, marker) {
            Ok(records) => {
                telemetry::records_emitted(self.name(), records.len());
                records
            }
            Err(e) => {
                warn!(decoder = self.name(), error = %e, "Failed to decode line, skipping.");
                telemetry::decode_failure(self.name());
                Vec::new()
            }
        }
    }
}

/// Splits `line` at its first comma. The remainder is empty when there is none.
pub(crate) fn split_first(line: &str) -> (&str, &str) {
    line.split_once(',').unwrap_or((line, ""))
}

/// Parses a single numeric value. Empty values read as `0` when
/// `empty_as_zero` is set, matching how nmon leaves unsupported columns blank.
pub(crate) fn parse_value(field: &str, raw: &str, empty_as_zero: bool) -> Result<f64, DecodeError> {
    let raw = raw.trim();
    if raw.is_empty() && empty_as_zero {
        return Ok(0.0);
    }
    let value: f64 = raw.parse().map_err(|_| DecodeError::InvalidNumber {
        field: field.to_string(),
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(DecodeError::NonFinite {
            field: field.to_string(),
        });
    }
    Ok(value)
}

/// Parses the first `names.len()` comma-separated values positionally.
/// Values beyond those are ignored.
pub(crate) fn parse_columns<const N: usize>(
    values: &str,
    names: &[&str; N],
) -> Result<[f64; N], DecodeError> {
    let raw: Vec<&str> = values.split(',').take(N).collect();
    if values.is_empty() || raw.len() < N {
        return Err(DecodeError::MissingFields {
            expected: N,
            found: if values.is_empty() { 0 } else { raw.len() },
        });
    }
    let mut parsed = [0.0; N];
    for (slot, (name, value)) in parsed.iter_mut().zip(names.iter().zip(raw)) {
        *slot = parse_value(name, value, true)?;
    }
    Ok(parsed)
}
