//! relaygate binary: loads configuration, starts the gateway server and waits for a shutdown signal

use relaygate::config::Config;
use relaygate::gateway::Gateway;
use relaygate::server::GatewayServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relaygate=debug".parse().expect("valid log directive")),
        )
        .init();

    // Load configuration; a missing default file means built-in defaults
    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match &explicit_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default("config.toml"),
    }
    .map_err(|e| {
        error!(path = ?explicit_path, error = %e, "Failed to load configuration");
        e
    })?;

    print_startup_banner(&config);

    let bind_addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .map_err(|e| {
            error!(bind = %config.server.bind, port = config.server.port, error = %e, "Invalid bind address");
            anyhow::anyhow!("Invalid bind address: {}", e)
        })?;

    let gateway = Arc::new(Gateway::from_config(&config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = GatewayServer::bind(bind_addr, gateway, shutdown_rx)
        .await?
        .with_max_body_bytes(config.server.max_body_bytes);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!(error = %e, "Gateway server error");
        }
    });

    wait_for_shutdown_signal().await;

    let _ = shutdown_tx.send(true);

    let _ = tokio::time::timeout(Duration::from_secs(5), server_handle).await;

    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT (Ctrl+C), shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down...");
    }
}

fn print_startup_banner(config: &Config) {
    info!(name = PKG_NAME, version = VERSION, "Starting gateway");
    info!(
        bind = %config.server.bind,
        port = config.server.port,
        max_body_bytes = config.server.max_body_bytes,
        "Server configuration"
    );
    info!(
        url = %config.upstream.base_url(),
        timeout_secs = config.upstream.timeout_secs,
        connect_timeout_secs = config.upstream.connect_timeout_secs,
        "Upstream settings"
    );
    info!(
        strip_prefixes = ?config.routing.strip_prefixes,
        health_timestamp = config.fallback.health_timestamp,
        "Routing and fallback settings"
    );
}
