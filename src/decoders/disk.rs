use super::{parse_value, DecodeError, MetricDecoder, RunContext};
use crate::config::ConfigError;
use crate::line_protocol::{Point, Precision};
use crate::marker::Marker;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which of nmon's per-disk tables a decoder reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiskMode {
    Read,
    Write,
    Busy,
}

impl DiskMode {
    pub const ALL: [DiskMode; 3] = [DiskMode::Read, DiskMode::Write, DiskMode::Busy];

    /// The nmon line prefix carrying this table.
    pub fn prefix(self) -> &'static str {
        match self {
            DiskMode::Read => "DISKREAD",
            DiskMode::Write => "DISKWRITE",
            DiskMode::Busy => "DISKBUSY",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiskMode::Read => "read",
            DiskMode::Write => "write",
            DiskMode::Busy => "busy",
        }
    }
}

impl fmt::Display for DiskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiskMode {
    type Err = ConfigError;

    /// Accepts the short selectors `r`, `w`, `b` as well as the full names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" | "read" => Ok(DiskMode::Read),
            "w" | "write" => Ok(DiskMode::Write),
            "b" | "busy" => Ok(DiskMode::Busy),
            other => Err(ConfigError::UnknownDiskMode(other.to_string())),
        }
    }
}

/// Decodes one of the `DISKREAD`, `DISKWRITE` or `DISKBUSY` tables.
///
/// nmon lists every block device as a column, so the number of values is
/// only known once the header has been seen:
///
/// ```text
/// DISKBUSY,Disk %Busy host,nvme0n1,nvme0n1p1,nvme0n1p2
/// DISKBUSY,T0001,4.7,0.0,4.7
/// ```
///
/// Values are paired positionally with the device names captured from the
/// header. Extra values or extra devices are dropped.
#[derive(Debug, Clone)]
pub struct DiskDecoder {
    name: String,
    measurement: String,
    run_id: String,
    devices: Arc<[String]>,
    mode: DiskMode,
    precision: Precision,
}

impl DiskDecoder {
    pub fn new(context: &RunContext, devices: Arc<[String]>, mode: DiskMode) -> Self {
        Self {
            name: format!("disk-{}", mode),
            measurement: context.measurement_for("disk"),
            run_id: context.run_id.clone(),
            devices,
            mode,
            precision: context.precision,
        }
    }

    pub fn mode(&self) -> DiskMode {
        self.mode
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }
}

impl MetricDecoder for DiskDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn decode_values(&self, values: &str, marker: &Marker) -> Result<Vec<String>, DecodeError> {
        if values.is_empty() {
            return Err(DecodeError::MissingFields {
                expected: self.devices.len(),
                found: 0,
            });
        }
        let timestamp = self.precision.epoch(&marker.instant);
        self.devices
            .iter()
            .zip(values.split(','))
            .map(|(device, raw)| -> Result<String, DecodeError> {
                let value = parse_value(device, raw, false)?;
                Ok(Point::new(&self.measurement, timestamp)
                    .tag("run", &self.run_id)
                    .tag("disk", device)
                    .tag("mode", self.mode.as_str())
                    .field("value", value)
                    .render())
            })
            .collect()
    }
}
