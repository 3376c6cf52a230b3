use super::{parse_columns, DecodeError, MetricDecoder, RunContext};
use crate::line_protocol::{Point, Precision};
use crate::marker::Marker;

/// Value columns of a `MEM` line, in nmon order.
const COLUMNS: [&str; 15] = [
    "memtotal",
    "hightotal",
    "lowtotal",
    "swaptotal",
    "memfree",
    "highfree",
    "lowfree",
    "swapfree",
    "memshared",
    "cached",
    "active",
    "bigfree",
    "buffers",
    "swapcached",
    "inactive",
];

/// Decodes `MEM` lines.
///
/// ```text
/// MEM,Memory MB host,memtotal,hightotal,lowtotal,swaptotal,memfree,highfree,lowfree,swapfree,memshared,cached,active,bigfree,buffers,swapcached,inactive
/// MEM,T0001,13841.9,-0.0,-0.0,0.0,7762.2,-0.0,-0.0,0.0,188.6,1981.8,780.1,-1.0,172.1,0.0,4513.8
/// ```
///
/// The high/low memory and bigfree columns are only meaningful on 32-bit
/// kernels and are not emitted.
#[derive(Debug, Clone)]
pub struct MemoryDecoder {
    measurement: String,
    run_id: String,
    precision: Precision,
}

impl MemoryDecoder {
    pub fn new(context: &RunContext) -> Self {
        Self {
            measurement: context.measurement_for("mem"),
            run_id: context.run_id.clone(),
            precision: context.precision,
        }
    }
}

impl MetricDecoder for MemoryDecoder {
    fn name(&self) -> &str {
        "mem"
    }

    fn decode_values(&self, values: &str, marker: &Marker) -> Result<Vec<String>, DecodeError> {
        let [
            memtotal,
            _hightotal,
            _lowtotal,
            swaptotal,
            memfree,
            _highfree,
            _lowfree,
            swapfree,
            memshared,
            cached,
            active,
            _bigfree,
            buffers,
            swapcached,
            inactive,
        ] = parse_columns(values, &COLUMNS)?;
        let record = Point::new(&self.measurement, self.precision.epoch(&marker.instant))
            .tag("run", &self.run_id)
            .field("memtotal", memtotal)
            .field("swaptotal", swaptotal)
            .field("memfree", memfree)
            .field("swapfree", swapfree)
            .field("memshared", memshared)
            .field("cached", cached)
            .field("active", active)
            .field("buffers", buffers)
            .field("swapcached", swapcached)
            .field("inactive", inactive)
            .render();
        Ok(vec![record])
    }
}
