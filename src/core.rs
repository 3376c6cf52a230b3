//! Core domain types and service traits for nmonflux
//!
//! This module defines the metric categories discovered from nmon headers and
//! the trait contracts that connect the parser to its collaborators: the line
//! source feeding it, the table decoders are registered into, and the outputs
//! receiving formatted records.

use crate::decoders::Decoder;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// Top-level metric categories whose decoders are discovered from headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Cpu,
    Mem,
    Disk,
}

impl Category {
    /// All categories that must be discovered before header scanning ends.
    pub const ALL: [Category; 3] = [Category::Cpu, Category::Mem, Category::Disk];

    /// The line prefix family announcing this category's headers.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::Cpu => "CPU",
            Category::Mem => "MEM",
            Category::Disk => "DISK",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// A table that decoders can be registered into, keyed by line prefix.
///
/// Implemented by the `DecoderRegistry`; tests use plain maps to observe what
/// the header scanner registers.
pub trait DecoderTable {
    /// Registers `decoder` for lines starting with `prefix`.
    /// A later registration for the same prefix replaces the earlier one.
    fn register(&mut self, prefix: &str, decoder: Decoder);
}

/// An ordered source of raw nmon output lines.
#[async_trait]
pub trait LineSource: Send {
    /// A short description of the source, used for logging.
    fn describe(&self) -> String;

    /// Reads the next line, without its trailing newline.
    ///
    /// # Returns
    /// * `Ok(Some(line))` for every line in arrival order
    /// * `Ok(None)` once the source is exhausted
    /// * `Err` if reading failed
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

/// Sends formatted records to a destination.
#[async_trait]
pub trait Output: Send + Sync {
    /// A unique, descriptive name for the output (e.g., "stdout", "file").
    /// Used for logging and metrics.
    fn name(&self) -> &str;

    /// Writes a single line protocol record.
    async fn send_record(&self, record: &str) -> Result<()>;
}
