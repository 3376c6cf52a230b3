//! Configuration management for nmonflux
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer, from lowest to highest priority: built-in
//! defaults, a TOML file, `NMONFLUX_`-prefixed environment variables, and
//! command-line arguments.

use crate::cli::Cli;
use crate::line_protocol::Precision;
use crate::marker::Zone;
use crate::registry::DEFAULT_MARKER_PREFIX;
use anyhow::Result;
use chrono::Local;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "nmonflux.toml";

/// Invalid construction parameters. Unlike bad input lines these are
/// programming or configuration mistakes and abort the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown disk mode {0:?}, expected 'r', 'w' or 'b'")]
    UnknownDiskMode(String),

    #[error("invalid time zone {0:?}, expected 'local', 'utc' or an offset like '+02:00'")]
    InvalidZone(String),
}

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level, used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Where nmon output is read from.
    pub source: SourceConfig,
    /// How nmon output is parsed.
    pub parser: ParserConfig,
    /// Where records are written.
    pub output: OutputConfig,
    /// Prometheus metrics endpoint.
    pub metrics: MetricsConfig,
}

/// Configuration for the nmon line source.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Command (program and arguments) whose stdout is nmon output.
    pub command: Vec<String>,
    /// Read nmon output from this file instead of running `command`.
    /// `-` reads standard input.
    pub input: Option<PathBuf>,
    /// Line prefixes dropped before parsing.
    pub ignored_prefixes: Vec<String>,
    /// Capacity of the bounded channels between pipeline stages.
    pub queue_capacity: usize,
}

/// Configuration for the streaming parser.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ParserConfig {
    /// Prefix of timestamp marker lines.
    pub marker_prefix: String,
    /// Base measurement name; records go to `cpu-<name>`, `mem-<name>`, `disk-<name>`.
    pub measurement: String,
    /// Run identifier tagged onto every record. Generated when absent.
    pub run_id: Option<String>,
    /// Prefix of generated run identifiers.
    pub run_prefix: String,
    /// Zone marker wall-clock times are read in: `local`, `utc` or `+HH:MM`.
    pub timezone: Zone,
    /// Resolution of record timestamps.
    pub precision: Precision,
}

/// Configuration for record outputs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Write records to standard output.
    pub stdout: bool,
    /// Append records to this file.
    pub file: Option<PathBuf>,
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_address: SocketAddr,
}

impl Config {
    /// Loads the application configuration, layering defaults, the TOML file
    /// named by `--config` (or `nmonflux.toml`), environment variables and
    /// the command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // Nested keys use a double underscore, e.g. NMONFLUX_PARSER__MEASUREMENT=host
            .merge(Env::prefixed("NMONFLUX_").split("__"))
            .merge(cli)
            .extract()?;
        Ok(config)
    }
}

impl ParserConfig {
    /// The configured run identifier, or `<run_prefix>-<local time now>`.
    pub fn resolve_run_id(&self) -> String {
        self.run_id.clone().unwrap_or_else(|| {
            format!(
                "{}-{}",
                self.run_prefix,
                Local::now().format("%Y-%m-%dT%H:%M:%S")
            )
        })
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            source: SourceConfig::default(),
            parser: ParserConfig::default(),
            output: OutputConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            command: vec!["sh".to_string(), "scripts/nmon-to-stdout.sh".to_string()],
            input: None,
            ignored_prefixes: [
                "AAA", "BBBP", "DISKBSIZE", "JFSFILE", "DISKXFER", "NET", "VM", "PROC",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            queue_capacity: 1024,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            marker_prefix: DEFAULT_MARKER_PREFIX.to_string(),
            measurement: "perf-metrics".to_string(),
            run_id: None,
            run_prefix: "nmon".to_string(),
            timezone: Zone::Local,
            precision: Precision::Seconds,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stdout: true,
            file: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: SocketAddr::from(([127, 0, 0, 1], 9105)),
        }
    }
}
