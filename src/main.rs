#![forbid(unsafe_code)]

//! `botshell` — chat-bot shell backend binary.
//!
//! Bootstraps configuration, builds the process supervisor, and starts the
//! UI bridge. The presentation layer connects over the local IPC socket;
//! ctrl-c/SIGTERM shuts the shell down, terminating any live bot process.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use botshell::bot::supervisor::Supervisor;
use botshell::bridge::server::spawn_bridge_server;
use botshell::config::GlobalConfig;
use botshell::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "botshell", about = "Chat-bot shell backend", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the bot script path from the config file.
    #[arg(long)]
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("botshell bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;

    // Override the bot script from the CLI if provided.
    if let Some(script) = args.script {
        let canonical = script
            .canonicalize()
            .map_err(|err| AppError::Config(format!("invalid script override: {err}")))?;
        config.script_path = canonical;
    }

    info!(script = %config.script_path.display(), "configuration loaded");

    // ── Build supervisor and bridge ─────────────────────
    let ct = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(config.event_buffer);

    let supervisor = Arc::new(Supervisor::new(config.spawn_config(), event_tx, ct.clone()));
    let bridge_handle =
        spawn_bridge_server(Arc::clone(&supervisor), &config.ipc_name, event_rx, ct.clone())?;

    info!("botshell ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    // Give the exit monitor a moment to reap a live bot process;
    // `kill_on_drop` backs it up when the runtime tears down.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let _ = bridge_handle.await;
    info!("botshell shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
