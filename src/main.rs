//! MCP server binary: serves the tool registry over stdio using
//! line-delimited JSON-RPC.
//!
//! Usage:
//!   toolscout [--config toolscout.toml] [--debug]

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use toolscout::config::Config;
use toolscout::observability::LogConfig;
use toolscout::registry::{handler_fn, LocalToolOptions, Registry};

#[derive(Parser, Debug)]
#[command(name = "toolscout")]
#[command(about = "Tool discovery MCP server")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, action)]
    debug: bool,

    /// Register a built-in ping tool (useful for smoke tests)
    #[arg(long, action)]
    with_ping: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(tracing::Level::INFO)
    };
    LogConfig::new(level).colors(false).init()?;

    info!(server = %config.server_name, "starting toolscout");

    let registry = Registry::new(config.registry());

    if args.with_ping {
        registry.register_local_fn(
            "ping",
            "Respond with pong",
            serde_json::json!({"type": "object", "properties": {}}),
            handler_fn(|_| async { Ok(serde_json::json!("pong")) }),
            LocalToolOptions::default(),
        )?;
    }

    registry.start().await?;

    let served = toolscout::registry::server::serve_stdio_process(&registry).await;
    registry.stop().await?;
    served?;

    info!("shutdown complete");
    Ok(())
}
