use super::{parse_columns, DecodeError, MetricDecoder, RunContext};
use crate::line_protocol::{Point, Precision};
use crate::marker::Marker;

/// Identifier of the system-wide CPU line. Its header is the last CPU header
/// nmon writes, so seeing it completes CPU discovery.
pub const AGGREGATE_CPU_ID: &str = "CPU_ALL";

const COLUMNS: [&str; 5] = ["user", "sys", "wait", "idle", "steal"];

/// Decodes `CPU001`..`CPUnnn` and `CPU_ALL` lines.
///
/// ```text
/// CPU_ALL,CPU Total host,User%,Sys%,Wait%,Idle%,Steal%,Busy,CPUs
/// CPU_ALL,T0001,2.4,1.0,0.3,96.4,0.0,,12
/// ```
#[derive(Debug, Clone)]
pub struct CpuDecoder {
    measurement: String,
    run_id: String,
    cpu_id: String,
    precision: Precision,
}

impl CpuDecoder {
    pub fn new(context: &RunContext, cpu_id: &str) -> Self {
        Self {
            measurement: context.measurement_for("cpu"),
            run_id: context.run_id.clone(),
            cpu_id: cpu_id.to_string(),
            precision: context.precision,
        }
    }
}

impl MetricDecoder for CpuDecoder {
    fn name(&self) -> &str {
        "cpu"
    }

    fn decode_values(&self, values: &str, marker: &Marker) -> Result<Vec<String>, DecodeError> {
        let [user, sys, wait, idle, steal] = parse_columns(values, &COLUMNS)?;
        let record = Point::new(&self.measurement, self.precision.epoch(&marker.instant))
            .tag("run", &self.run_id)
            .tag("cpus", &self.cpu_id)
            .field("user", user)
            .field("sys", sys)
            .field("wait", wait)
            .field("idle", idle)
            .field("steal", steal)
            .render();
        Ok(vec![record])
    }
}
