//! Marketplace session server.
//!
//! Composition root: loads configuration, initialises logging, wires the
//! account directory and session log into the API state, and serves it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use market_api::{AppState, build_router};
use market_auth::account::MemoryAccountDirectory;
use market_auth::session::{FileSessionLog, MemorySessionLog, SessionLog, SessionLogSweeper};
use market_core::config::AppConfig;

#[tokio::main]
async fn main() {
    let env = std::env::var("MARKET_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        error!(error = %format!("{e:#}"), "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting marketplace session server");

    let accounts = MemoryAccountDirectory::from_seeds(&config.auth.accounts)
        .context("Failed to load seed accounts")?;
    if config.auth.accounts.is_empty() {
        warn!("No accounts configured; every login will be refused");
    }

    let session_log: Arc<dyn SessionLog> = match &config.session.log_path {
        Some(path) => Arc::new(
            FileSessionLog::open(path)
                .await
                .with_context(|| format!("Failed to open session log at {path}"))?,
        ),
        None => {
            info!("Using in-memory session log");
            Arc::new(MemorySessionLog::new())
        }
    };

    let sweeper = SessionLogSweeper::new(session_log.clone(), config.auth.token_ttl_seconds)
        .spawn(config.session.sweep_interval());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let state = AppState::new(config, Arc::new(accounts), session_log);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            sweeper.abort();
            result.context("Server task panicked")??;
            return Ok(());
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, starting graceful shutdown");
        }
    }

    sweeper.abort();
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(grace, server).await {
        Ok(result) => result.context("Server task panicked")??,
        Err(_) => warn!(grace_seconds = grace.as_secs(), "Grace period elapsed, dropping open connections"),
    }

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
