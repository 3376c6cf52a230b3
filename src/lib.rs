//! nmonflux - streams nmon snapshot output as InfluxDB line protocol.
//!
//! The core is a stateful streaming parser: header lines announce which CPU
//! cores and disks exist on the monitored host, decoders are registered for
//! them at runtime, and every later snapshot line is decoded against the most
//! recent `ZZZZ` timestamp marker.

pub mod app;
pub mod capture;
pub mod cli;
pub mod config;
pub mod core;
pub mod decoders;
pub mod header;
pub mod line_protocol;
pub mod marker;
pub mod outputs;
pub mod pipeline;
pub mod registry;
pub mod telemetry;

// Re-export core types for convenience
pub use crate::core::*;
pub use crate::pipeline::NmonParser;
