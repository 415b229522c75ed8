//! Search gate
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ listener ─▶ http server ─▶ body classification (400/413)
//!                                                     │
//!                                                     ▼
//!                                   ┌──────────────────────────────────┐
//!                                   │          gating pipeline          │
//!                                   │  access policy   ──▶ 403          │
//!                                   │  rate limiter    ──▶ 429          │
//!                                   │  size capper     (rewrite size)   │
//!                                   └────────────────┬─────────────────┘
//!                                                    ▼
//!     Client Response                           forwarder ──────────▶ search backend
//!     ◀──────────────────────────────────────── (502/504 on failure)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use search_gate::admin::{run_admin, AdminState};
use search_gate::config::{load_config, GateConfig};
use search_gate::http::GateServer;
use search_gate::lifecycle::{spawn_signal_listener, Shutdown};
use search_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "search-gate")]
#[command(about = "Policy gateway in front of a search backend", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    let level = args.log_level.as_deref().unwrap_or(&config.observability.log_level);
    logging::init_logging(level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "search-gate starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.address,
        window_ms = config.rate_limit.window_ms,
        max_requests = config.rate_limit.max_requests,
        default_size = config.result_size.default_size,
        max_size = config.result_size.max_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GateServer::new(config.clone())?;

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState {
            config: Arc::new(config.clone()),
            pipeline: server.pipeline(),
        };
        let admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = run_admin(admin_listener, state, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
