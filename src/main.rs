//! call-tracker service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Inbound request
//!   ───────────────▶ transaction middleware ──▶ handler ──▶ TrackedClient ──▶ upstream
//!                    (id + scope + request        │              │
//!                     attributes)                 │              ▼
//!                                                 │        CallTracker
//!                                                 │              │
//!                                                 │              ▼
//!                                                 │   AggregatorStore ◀── Sweeper (5 min)
//!                                                 │              │
//!                                                 ▼              ▼
//!                                            JSON report    FlushPolicy ──▶ AttributeSink
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use call_tracker::backend::LogSink;
use call_tracker::config::{load_config, ConfigWatcher, TrackerConfig};
use call_tracker::http::AppServer;
use call_tracker::lifecycle::{signals, Shutdown};
use call_tracker::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "call-tracker")]
#[command(about = "HTTP service that aggregates outbound calls per transaction", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the server bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("call-tracker v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        attribute_prefix = %config.tracking.attribute_prefix,
        emit_rollups = config.tracking.emit_rollups,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_ctrl_c_listener(shutdown.clone());

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run(config.clone()) {
                Ok(handle) => (updates, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (mpsc::unbounded_channel().1, None)
                }
            }
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = AppServer::new(config, Arc::new(LogSink))?;
    server.run(listener, config_updates, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
