//! The streaming parser: header discovery and dispatch behind a single
//! line-at-a-time entry point.

use crate::config::ParserConfig;
use crate::decoders::RunContext;
use crate::header::HeaderScanner;
use crate::marker::Zone;
use crate::registry::DecoderRegistry;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace};

/// Turns an ordered stream of nmon lines into line protocol records.
///
/// Header lines register decoders until CPU, MEM and DISK discovery are all
/// complete. Every line, header or not, is then dispatched to the registry
/// exactly once, so a data line following its header in the same stream is
/// decoded as soon as a matching marker has been seen.
#[derive(Debug)]
pub struct NmonParser {
    scanner: HeaderScanner,
    registry: DecoderRegistry,
}

impl NmonParser {
    pub fn new(context: RunContext, marker_prefix: impl Into<String>, zone: Zone) -> Self {
        Self {
            scanner: HeaderScanner::new(context),
            registry: DecoderRegistry::new(marker_prefix, zone),
        }
    }

    /// Builds a parser from the `[parser]` configuration section, resolving
    /// the run identifier.
    pub fn from_config(config: &ParserConfig) -> Self {
        let run_id = config.resolve_run_id();
        info!(run_id = %run_id, measurement = %config.measurement, "Parser configured.");
        let context =
            RunContext::new(config.measurement.clone(), run_id).with_precision(config.precision);
        Self::new(context, config.marker_prefix.clone(), config.timezone)
    }

    /// Processes one line and returns the records it produced, in order.
    pub fn feed(&mut self, line: &str) -> Vec<String> {
        if !self.scanner.registered_all() {
            self.scanner.observe(line, &mut self.registry);
        }
        self.registry.dispatch(line)
    }

    /// Lazily maps `lines` to their records, preserving line order.
    pub fn records<'a, I>(&'a mut self, lines: I) -> impl Iterator<Item = String> + 'a
    where
        I: IntoIterator + 'a,
        I::Item: AsRef<str>,
    {
        lines
            .into_iter()
            .flat_map(move |line| self.feed(line.as_ref()))
    }

    pub fn discovery_complete(&self) -> bool {
        self.scanner.registered_all()
    }

    pub fn scanner(&self) -> &HeaderScanner {
        &self.scanner
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }
}

/// Runs the parser over `lines_rx`, forwarding every record to `records_tx`.
///
/// Ends when the line channel closes or the record receiver goes away.
#[instrument(skip_all)]
pub async fn run_parser_stage(
    mut parser: NmonParser,
    mut lines_rx: mpsc::Receiver<String>,
    records_tx: mpsc::Sender<String>,
) {
    let mut lines = 0u64;
    let mut records = 0u64;
    'stream: while let Some(line) = lines_rx.recv().await {
        lines += 1;
        trace!(line = %line, "Parsing line.");
        for record in parser.feed(&line) {
            if records_tx.send(record).await.is_err() {
                debug!("Record receiver dropped, stopping parser stage.");
                break 'stream;
            }
            records += 1;
        }
    }
    info!(
        lines,
        records,
        decoders = parser.registry().len(),
        discovery_complete = parser.discovery_complete(),
        "Parser stage finished."
    );
}
