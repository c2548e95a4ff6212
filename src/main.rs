//! xAPI endpoint server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (timeout, request id, trace)
//!                         │
//!                         ▼
//!                     http::context (method, headers, params, body)
//!                         │
//!                         ▼
//!                     dispatch::dispatcher ── verb ──▶ resource hook
//!                         │                              │
//!                         │                     params pipeline + version gate
//!                         ▼                              │
//!                     failure envelope ◀── Failure ──────┘
//!                         │
//!                         ▼
//!     Client Response ◀── http::cors (on every path)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use xapi_endpoint::config::{load_config, EndpointConfig};
use xapi_endpoint::lifecycle::{signals, Shutdown};
use xapi_endpoint::observability::{logging, metrics};
use xapi_endpoint::params::XapiTypeValidator;
use xapi_endpoint::resources::DocumentResource;
use xapi_endpoint::EndpointServer;

#[derive(Parser)]
#[command(name = "xapi-endpoint")]
#[command(about = "xAPI request-dispatch endpoint", long_about = None)]
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
        None => EndpointConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("xapi-endpoint v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_url = %config.service.base_url,
        route_prefix = %config.service.route_prefix,
        request_timeout_secs = config.timeouts.request_secs,
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

    let validator = Arc::new(XapiTypeValidator);
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = EndpointServer::new(config)?
        .mount("/activities/state", DocumentResource::new("stateId", validator));

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&signal_shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
