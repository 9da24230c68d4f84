//! Listen Monitor - desktop notifications for directory changes.
//!
//! Watches a directory tree, prints modified and removed paths, and shows a
//! desktop notification for newly added files.
//!
//! # Environment Variables
//!
//! See the [`config`](listen_monitor::config) module for available
//! configuration options.

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use listen_monitor::config::Config;
use listen_monitor::monitor::Monitor;
use listen_monitor::notifier::DesktopNotifier;

/// Listen Monitor - desktop notifications for directory changes.
///
/// Watches a directory and shows a notification whenever a file is added.
/// Modified and removed files are listed on standard output.
#[derive(Parser, Debug)]
#[command(name = "listen-monitor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    LISTEN_MONITOR_ROOT              Directory to watch (default: .)
    LISTEN_MONITOR_RELATIVE_PATHS    Report paths relative to the root (default: false)
    LISTEN_MONITOR_LATENCY_MS        Batch window in milliseconds (default: 100)
    LISTEN_MONITOR_FORCE_POLLING     Poll instead of using native events (default: false)
    LISTEN_MONITOR_POLL_INTERVAL_MS  Polling interval in milliseconds (default: 1000)
    LISTEN_MONITOR_BUFFER_SIZE       Change batch buffer size (default: 1000)
    LISTEN_MONITOR_IGNORE            Comma-separated extra names to ignore
    LISTEN_MONITOR_STARTUP_URL       Target of the startup notification
    RUST_LOG                         Log filter (default: info)
")]
struct Cli {}

fn main() -> Result<()> {
    let _cli = Cli::parse();

    init_logging();

    if let Err(e) = run() {
        error!(error = %format!("{e:#}"), "Monitor failed");
        return Err(e);
    }

    Ok(())
}

fn run() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        root = %config.root.display(),
        relative_paths = config.relative_paths,
        force_polling = config.force_polling,
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            wait_for_shutdown().await;
            info!("Shutdown signal received");
            signal_token.cancel();
        });

        let monitor = Monitor::new(config, DesktopNotifier::new(), io::stdout());
        monitor
            .run(shutdown)
            .await
            .context("Failed to monitor directory")
    })
}

/// Initializes the logging subsystem.
///
/// Logs go to stderr; stdout carries the change listing.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
