//! Prefix-keyed dispatch of nmon lines to their decoders.

use crate::core::DecoderTable;
use crate::decoders::{split_first, Decoder};
use crate::marker::{Marker, Zone};
use crate::telemetry;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Line prefix of nmon's per-snapshot timestamp marker.
pub const DEFAULT_MARKER_PREFIX: &str = "ZZZZ";

/// Maps line prefixes to decoders and tracks the current timestamp marker.
///
/// Marker lines replace the current marker; every other line is handed to the
/// decoder registered for its prefix together with that marker. Lines whose
/// prefix has no decoder (yet) are ignored.
#[derive(Debug)]
pub struct DecoderRegistry {
    marker_prefix: String,
    zone: Zone,
    marker: Option<Marker>,
    decoders: HashMap<String, Decoder>,
}

impl DecoderRegistry {
    /// Creates an empty registry.
    ///
    /// # Arguments
    /// * `marker_prefix` - prefix of timestamp marker lines (`ZZZZ` for nmon)
    /// * `zone` - zone the marker wall-clock times are interpreted in
    pub fn new(marker_prefix: impl Into<String>, zone: Zone) -> Self {
        Self {
            marker_prefix: marker_prefix.into(),
            zone,
            marker: None,
            decoders: HashMap::new(),
        }
    }

    /// Dispatches one raw line, returning the records it decodes to.
    pub fn dispatch(&mut self, line: &str) -> Vec<String> {
        let (prefix, rest) = split_first(line);
        if prefix == self.marker_prefix {
            self.update_marker(rest);
            return Vec::new();
        }
        match self.decoders.get(prefix) {
            Some(decoder) => decoder.decode(rest, self.marker.as_ref()),
            None => {
                trace!(prefix, "No decoder registered for prefix, ignoring line.");
                Vec::new()
            }
        }
    }

    fn update_marker(&mut self, fields: &str) {
        match Marker::parse(fields, self.zone) {
            Ok(marker) => {
                trace!(code = %marker.code, instant = %marker.instant, "Timestamp marker updated.");
                self.marker = Some(marker);
            }
            Err(e) => {
                warn!(
                    fields,
                    error = %e,
                    "Failed to parse timestamp marker, keeping the previous one."
                );
                telemetry::marker_failure();
            }
        }
    }

    /// The most recently parsed marker, if any.
    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    pub fn marker_prefix(&self) -> &str {
        &self.marker_prefix
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.decoders.contains_key(prefix)
    }

    pub fn get(&self, prefix: &str) -> Option<&Decoder> {
        self.decoders.get(prefix)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Registered prefixes, sorted.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_PREFIX, Zone::default())
    }
}

impl DecoderTable for DecoderRegistry {
    fn register(&mut self, prefix: &str, decoder: Decoder) {
        debug!(prefix, decoder = decoder.name(), "Registering decoder.");
        self.decoders.insert(prefix.to_string(), decoder);
    }
}
