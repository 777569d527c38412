// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! cage-server: hook capture and event streaming for a project.
//!
//! Receives hook payloads, appends them to the project's date-partitioned
//! event log, and pushes size-bounded notifications to every open stream.
//! Clients pull full records through the query endpoints.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cage_core::store::STATE_DIR_NAME;
use cage_server::config::ServerConfig;
use cage_server::error::ServerError;
use cage_server::server;
use cage_server::state::AppState;

/// cage-server: event capture and streaming server
#[derive(Parser, Debug)]
#[command(name = "cage-server", version)]
#[command(about = "Captures assistant hook events and streams change notifications")]
struct Args {
    /// Project root holding the .cage directory
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Address to bind the server to (overrides config)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Seconds between stream heartbeats, 0 to disable (overrides config)
    #[arg(long)]
    heartbeat_interval: Option<u64>,

    /// Debug log entries kept in memory (overrides config)
    #[arg(long)]
    max_logs: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging(args.verbose, args.log_file.as_deref());

    let mut config = ServerConfig::load(&args.root.join(STATE_DIR_NAME))?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(secs) = args.heartbeat_interval {
        config.heartbeat_interval_secs = secs;
    }
    if let Some(max_logs) = args.max_logs {
        config.max_logs = max_logs;
    }

    info!("Starting cage-server");
    info!("  Bind address: {}", config.bind);
    info!("  Project root: {}", args.root.display());
    info!("  Heartbeat: {}s", config.heartbeat_interval_secs);

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;
    let state = AppState::new(&args.root, config);

    server::run(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!("cage-server stopped");
    Ok(())
}

fn setup_logging(verbose: bool, log_path: Option<&Path>) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Try to open the log file, fall back to stderr
    let file = log_path.and_then(|path| {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    if let Some(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
