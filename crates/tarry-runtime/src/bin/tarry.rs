//! Evaluation server with breakpoint debugging.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tarry_runtime::config::ServerConfig;
use tarry_runtime::control::{spawn_control_server, ControlEndpoint, ControlState};
use tarry_runtime::DebugService;

#[derive(Debug, Parser)]
#[command(
    name = "tarry",
    version,
    about = "Evaluation server with breakpoint debugging",
    after_help = "Examples:\n  tarry\n  tarry --listen unix:///tmp/tarry.sock\n  tarry --config tarry.toml --log-level debug"
)]
struct Args {
    /// Configuration file (tarry.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Control endpoint (tcp://127.0.0.1:PORT or unix:///path).
    #[arg(long)]
    listen: Option<String>,
    /// Log filter directive, e.g. `info` or `tarry_runtime=debug`.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen.into();
    }
    if let Some(level) = args.log_level {
        config.log_level = level.into();
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.as_str()))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let endpoint = ControlEndpoint::parse(&config.listen)?;
    let debug = Arc::new(DebugService::new(config.debug.clone()));
    let state = Arc::new(ControlState::new(debug));
    let server = spawn_control_server(&endpoint, state)?;
    match server.local_addr {
        Some(addr) => info!(%addr, detached = ?config.debug.detached, "tarry listening"),
        None => info!(endpoint = config.listen.as_str(), "tarry listening"),
    }
    server.join();
    Ok(())
}
