//! The main application logic, decoupled from the entry point.

use crate::{
    capture::{open_source, Capture, PrefixFilter},
    config::Config,
    core::{LineSource, Output},
    outputs::{run_output_stage, OutputManager},
    pipeline::{run_parser_stage, NmonParser},
};
use anyhow::{anyhow, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// A handle to the running application, containing all its task handles.
pub struct App {
    capture: JoinHandle<Result<()>>,
    stages: Vec<(&'static str, JoinHandle<()>)>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Waits for the pipeline to finish.
    ///
    /// The pipeline ends when the source is exhausted or shutdown is
    /// signalled; records already in flight are still delivered.
    pub async fn run(self) -> Result<()> {
        let capture_result = match self.capture.await {
            Ok(result) => result,
            Err(e) => Err(anyhow!("capture task panicked: {}", e)),
        };
        if let Err(e) = &capture_result {
            error!(error = %e, "Capture failed.");
        }

        let (names, handles): (Vec<_>, Vec<_>) = self.stages.into_iter().unzip();
        let mut panicked = Vec::new();
        for (name, result) in names.into_iter().zip(join_all(handles).await) {
            if let Err(e) = result {
                error!(stage = name, error = ?e, "Stage task panicked.");
                panicked.push(name);
            }
        }

        capture_result?;
        if !panicked.is_empty() {
            return Err(anyhow!("pipeline stages panicked: {}", panicked.join(", ")));
        }
        info!("All stages finished.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the pipeline from running it, and lets tests swap
/// the line source and the outputs for in-memory ones.
pub struct AppBuilder {
    config: Config,
    source_override: Option<Box<dyn LineSource>>,
    output_override: Option<Vec<Arc<dyn Output>>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            source_override: None,
            output_override: None,
        }
    }

    /// Overrides the line source for testing.
    pub fn source_override(mut self, source: Box<dyn LineSource>) -> Self {
        self.source_override = Some(source);
        self
    }

    /// Overrides the outputs for testing.
    pub fn output_override(mut self, outputs: Vec<Arc<dyn Output>>) -> Self {
        self.output_override = Some(outputs);
        self
    }

    /// Opens the source and outputs and spawns the capture, parser and output
    /// stages, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<()>) -> Result<App> {
        let config = self.config;

        // =========================================================================
        // 1. Outputs
        // =========================================================================
        let output_manager = match self.output_override {
            Some(outputs) => OutputManager::new(outputs),
            None => OutputManager::from_config(&config.output).await?,
        };
        let output_manager = Arc::new(output_manager);

        // =========================================================================
        // 2. Source
        // =========================================================================
        let source = match self.source_override {
            Some(source) => source,
            None => open_source(&config.source).await?,
        };
        debug!(source = %source.describe(), "Line source opened.");

        // =========================================================================
        // 3. Pipeline
        // =========================================================================
        let capacity = config.source.queue_capacity.max(1);
        let (lines_tx, lines_rx) = mpsc::channel::<String>(capacity);
        let (records_tx, records_rx) = mpsc::channel::<String>(capacity);

        let parser = NmonParser::from_config(&config.parser);
        let filter = PrefixFilter::new(config.source.ignored_prefixes.iter().cloned());
        let capture = Capture::new(source, filter, lines_tx);

        let capture = tokio::spawn(capture.run(shutdown_rx));
        let stages = vec![
            ("parser", tokio::spawn(run_parser_stage(parser, lines_rx, records_tx))),
            ("output", tokio::spawn(run_output_stage(output_manager, records_rx))),
        ];

        info!(capacity, "Pipeline started.");
        Ok(App { capture, stages })
    }
}
