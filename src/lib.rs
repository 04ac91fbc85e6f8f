pub mod error;
pub mod models;
pub mod modules;
pub mod proxy; // Relay service module

use anyhow::Context;
use modules::logger;
use tracing::{info, warn};

/// Run the relay until Ctrl-C / SIGTERM
pub async fn run() -> anyhow::Result<()> {
    // Config first so the logger knows where to write
    let config = modules::config::load_app_config().context("Failed to load configuration")?;

    logger::init_logger(config.log_dir.as_deref());

    if config.proxy.uses_placeholder_token() {
        warn!("PROXY_AUTH_TOKEN is not set; the placeholder token is in use");
    }
    if config.proxy.allowed_domains.is_empty() {
        info!("No ALLOWED_DOMAINS configured; every public domain may be relayed");
    } else {
        info!("Allowed domains: {}", config.proxy.allowed_domains.join(", "));
    }
    info!("Upstream timeout: {}s", config.proxy.request_timeout);

    let (server, handle) = proxy::AxumServer::start(config.proxy)
        .await
        .context("Failed to start relay server")?;

    shutdown_signal().await;
    info!("Shutdown signal received");

    server.stop();
    handle.await.context("Relay server task failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
