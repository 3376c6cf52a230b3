//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `nmonflux.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Streams nmon performance snapshots as InfluxDB line protocol.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Read nmon output from a file ('-' for stdin) instead of running the capture command.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Run identifier tagged onto every record.
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    /// Base measurement name.
    #[arg(short, long, value_name = "NAME")]
    pub measurement: Option<String>,

    /// Prefix of timestamp marker lines.
    #[arg(long, value_name = "PREFIX")]
    pub marker_prefix: Option<String>,

    /// Zone of marker times: 'local', 'utc' or an offset like '+02:00'.
    #[arg(long, value_name = "ZONE")]
    pub timezone: Option<String>,

    /// Timestamp precision: seconds, milliseconds, microseconds or nanoseconds.
    #[arg(long, value_name = "UNIT")]
    pub precision: Option<String>,

    /// Also append records to this file.
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Logging level used when RUST_LOG is not set.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Serve Prometheus metrics.
    #[arg(long)]
    pub metrics: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(input) = &self.input {
            set(&mut dict, "source", "input", path_value(input));
        }
        if let Some(run_id) = &self.run_id {
            set(&mut dict, "parser", "run_id", Value::from(run_id.as_str()));
        }
        if let Some(measurement) = &self.measurement {
            set(&mut dict, "parser", "measurement", Value::from(measurement.as_str()));
        }
        if let Some(prefix) = &self.marker_prefix {
            set(&mut dict, "parser", "marker_prefix", Value::from(prefix.as_str()));
        }
        if let Some(zone) = &self.timezone {
            set(&mut dict, "parser", "timezone", Value::from(zone.as_str()));
        }
        if let Some(precision) = &self.precision {
            set(&mut dict, "parser", "precision", Value::from(precision.as_str()));
        }
        if let Some(file) = &self.output_file {
            set(&mut dict, "output", "file", path_value(file));
        }
        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.as_str()));
        }
        // A bare flag can only switch the endpoint on; absence leaves lower layers alone.
        if self.metrics {
            set(&mut dict, "metrics", "enabled", Value::from(true));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

/// Inserts `section.key`, creating the nested section table on first use.
fn set(dict: &mut Dict, section: &str, key: &str, value: Value) {
    let table = dict
        .entry(section.to_string())
        .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
    if let Value::Dict(_, table) = table {
        table.insert(key.to_string(), value);
    }
}

fn path_value(path: &std::path::Path) -> Value {
    Value::from(path.to_string_lossy().into_owned())
}
