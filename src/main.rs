//! Session-aware forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                  SESSION PROXY                   │
//!                      │                                                  │
//!   GET /proxy/<url>   │  ┌─────────┐    ┌─────────┐    ┌─────────────┐  │
//!   ───────────────────┼─▶│  http   │───▶│ handler │───▶│   session   │  │
//!                      │  │ server  │    │         │    │   manager   │  │
//!                      │  └─────────┘    └────┬────┘    └──────┬──────┘  │
//!                      │                      │   cookie store │         │
//!                      │                      ▼◀───────────────┘         │
//!   response           │                ┌───────────┐                    │
//!   (no Set-Cookie)    │                │  client   │────────────────────┼──▶ <url>
//!   ◀──────────────────┼────────────────│ executor  │◀───────────────────┼───
//!                      │                └───────────┘                    │
//!                      │                                                  │
//!                      │   config · observability · lifecycle             │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use session_proxy::config::validation::validate_config;
use session_proxy::config::{load_config, ConfigError, ProxyConfig};
use session_proxy::lifecycle::{signals, Shutdown};
use session_proxy::observability::{logging, metrics};
use session_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "session-proxy")]
#[command(about = "Forwarding proxy with per-session cookie isolation", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!("session-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        mount_prefix = %config.proxy.mount_prefix,
        follow_redirects = config.upstream.follow_redirects,
        idle_ttl_secs = config.session.idle_ttl_secs,
        max_sessions = config.session.max_sessions,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
