//! Appliance API - Main Entry Point

use std::sync::Arc;

use clap::Parser;
use mimalloc::MiMalloc;

use appliance_api::config::AppConfig;
use appliance_api::logging::init_tracing;
use appliance_api::runtime::{SessionReaper, spawn_reaper};
use appliance_api::server::{build_router, build_state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Command-line arguments. Flags override the loaded configuration.
#[derive(Parser, Debug)]
#[command(name = "appliance-api")]
#[command(about = "Appliance API - PDF device extraction and catalog matching")]
#[command(version)]
struct Args {
    /// Host to bind to.
    #[arg(long, env = "APPLIANCE_API_HOST")]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "APPLIANCE_API_PORT")]
    port: Option<u16>,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, env = "APPLIANCE_API_LOG_LEVEL")]
    log_level: Option<String>,

    /// Config file path.
    #[arg(short, long, env = "APPLIANCE_API_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let default_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&config.logging, &default_level)?;

    tracing::info!("Starting Appliance API v{}", env!("CARGO_PKG_VERSION"));

    let addr = config.server.bind_address();
    let reaper = config.sessions.idle_timeout().map(|idle_timeout| SessionReaper {
        idle_timeout,
        interval: config.sessions.reap_interval(),
    });

    let state = build_state(config).await?;
    let reaper_handle = reaper.map(|reaper| spawn_reaper(Arc::clone(&state.registry), reaper));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = reaper_handle {
        handle.abort();
    }
    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
