//! Bomb Arena Server - Authoritative game-logic server for a grid bomb arena
//!
//! Runs one shared session:
//! - WebSocket connections carry player events in and results out
//! - A fixed-rate tick loop owns movement, bomb fuses and blast resolution
//! - `/health` reports session counters

mod app;
mod config;
mod game;
mod http;
mod util;
mod ws;

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::map::{MapLayout, DEFAULT_COLS, DEFAULT_ROWS};
use crate::game::{GameSession, SessionSettings, SessionState};
use crate::http::build_router;
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Bomb Arena Server");
    info!("Server address: {}", config.server_addr);

    // Prepare the arena
    let layout = match &config.map_path {
        Some(path) => MapLayout::load(path)
            .with_context(|| format!("loading map from {}", path.display()))?,
        None => {
            info!(seed = config.map_seed, density = config.chest_density, "Generating arena");
            MapLayout::generate(DEFAULT_COLS, DEFAULT_ROWS, config.map_seed, config.chest_density)?
        }
    };
    let settings = SessionSettings::from_config(&config);
    info!(
        bomb_power = settings.bomb_power,
        fuse_ticks = settings.fuse_ticks,
        explosion_ticks = settings.explosion_ticks,
        "Session settings"
    );
    let session_state = SessionState::new(&layout, settings).context("building arena index")?;

    // Spawn the session loop
    let (session, handle) = GameSession::new(session_state);
    tokio::spawn(session.run());

    // Create application state and router
    let state = AppState::new(config.clone(), handle);
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C or SIGTERM
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
