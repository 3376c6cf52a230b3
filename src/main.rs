//! nmonflux - nmon to InfluxDB line protocol
//!
//! Runs (or reads the recorded output of) the nmon system monitor and streams
//! its CPU, memory and disk snapshots as line protocol records.

use anyhow::Result;
use clap::Parser;
use nmonflux::{app::App, cli::Cli, config::Config, telemetry};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    // Records go to stdout, so logs go to stderr.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("nmonflux starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    match &config.source.input {
        Some(path) => info!("Input: {}", path.display()),
        None => info!("Capture Command: {}", config.source.command.join(" ")),
    }
    info!("Ignored Prefixes: {}", config.source.ignored_prefixes.join(", "));
    info!("Queue Capacity: {}", config.source.queue_capacity);
    info!("Marker Prefix: {}", config.parser.marker_prefix);
    info!("Measurement: {}", config.parser.measurement);
    info!("Time Zone: {}", config.parser.timezone);
    info!("Precision: {}", config.parser.precision);
    info!("Stdout Output: {}", if config.output.stdout { "Enabled" } else { "Disabled" });
    if let Some(path) = &config.output.file {
        info!("File Output: {}", path.display());
    }
    if config.metrics.enabled {
        info!("Metrics Endpoint: {}", config.metrics.listen_address);
    }
    info!("-------------------------------------------------------");

    telemetry::install_exporter(&config.metrics)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Shutting down gracefully...");
            let _ = shutdown_tx.send(());
        }
    });

    app.run().await?;
    info!("All tasks shut down. Exiting.");
    Ok(())
}
