//! HTTP relay (v1)
//!
//! Lets a browser client issue cross-origin requests indirectly.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                  HTTP RELAY                  │
//!     POST /proxy         │  ┌─────────┐   ┌───────────┐   ┌──────────┐  │
//!     ────────────────────┼─▶│  http   │──▶│  request  │──▶│ executor │  │
//!                         │  │ server  │   │ validator │   │          │  │
//!                         │  └─────────┘   └───────────┘   └────┬─────┘  │
//!                         │                                     │        │
//!                         │                                     ▼        │
//!     200 + envelope      │  ┌─────────┐                 ┌───────────┐   │
//!     ◀───────────────────┼──│envelope │◀────────────────│ transport │◀──┼──── Target
//!                         │  └─────────┘                 │ (reqwest) │   │     Server
//!                         │                              └───────────┘   │
//!                         │  config · observability · lifecycle          │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_relay::config::resolve_config;
use http_relay::observability::{logging, metrics};
use http_relay::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "http-relay", version, about = "Relay HTTP requests on behalf of browser clients")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address (e.g. 0.0.0.0:8000).
    #[arg(short, long, env = "RELAY_BIND_ADDRESS")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match resolve_config(args.config.as_deref(), args.bind.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("http-relay: invalid configuration: {e}");
            return Err(e.into());
        }
    };

    logging::init_tracing(&config.observability);

    tracing::info!("http-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        client_timeout_secs = ?config.client.timeout_secs,
        cors_origins = ?config.cors.allow_origins,
        static_dir = %config.static_files.dir,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        let addr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(error = %e, "Failed to start metrics endpoint");
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
