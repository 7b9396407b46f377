//! Image API server.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────────────┐
//!                    │                    IMAGE ROUTER                       │
//!                    │                                                       │
//!   Client Request   │  ┌─────────┐    ┌──────────┐    ┌──────────────┐      │
//!   ─────────────────┼─▶│  http   │───▶│ dispatch │───▶│ route table  │      │
//!                    │  │ server  │    │          │    │ (compat +    │      │
//!                    │  └─────────┘    └────┬─────┘    │  native)     │      │
//!                    │                      │          └──────────────┘      │
//!                    │                      ▼                                │
//!   Client Response  │               ┌──────────────┐    ┌──────────────┐    │
//!   ◀────────────────┼───────────────│   handlers   │───▶│ image backend│    │
//!                    │               └──────────────┘    └──────────────┘    │
//!                    │                                                       │
//!                    │   config · observability · lifecycle                  │
//!                    └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use image_router::config::{load_config, ServerConfig};
use image_router::lifecycle::{build_route_table, wait_for_signal, Shutdown};
use image_router::observability::{init_logging, metrics};
use image_router::{HttpServer, ImageHandlers, MemoryImageBackend};

#[derive(Parser)]
#[command(name = "image-router")]
#[command(about = "Versioned HTTP API for container images", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the route table and exit
    #[arg(long)]
    print_routes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability.log_level);
    tracing::info!("image-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        api_version = config.api.version.as_deref().unwrap_or("negotiated"),
        request_timeout_secs = ?config.timeouts.request_secs,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    let backend = Arc::new(MemoryImageBackend::new());
    let handlers = ImageHandlers::new(backend);
    let routes = Arc::new(build_route_table(&config, &handlers)?);

    if args.print_routes {
        print!("{routes}");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
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
    let server = HttpServer::new(&config, routes);
    let stopped = shutdown.subscribe();

    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, stopped).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
