//! Server binary for the ClearPath dispatch simulator.
//!
//! This is the main entry point that wires together the state store,
//! the broadcast channel, the scenario guard, the analytics ticker, and
//! the HTTP server. It runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `clearpath-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the dispatcher over fresh default state
//! 4. Spawn the analytics ticker
//! 5. Serve HTTP and `WebSocket` until shutdown

mod error;

use std::path::Path;
use std::sync::Arc;

use clearpath_api::AppState;
use clearpath_core::config::{ClearPathConfig, LogFormat, LoggingConfig};
use clearpath_core::{Broadcaster, Dispatcher, ScenarioControl, StateStore, analytics};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Config file looked up in the working directory.
const CONFIG_PATH: &str = "clearpath-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the server fails.
#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;

    info!("clearpath-server starting");
    if from_file {
        info!(path = CONFIG_PATH, "Configuration loaded");
    } else {
        info!("Config file not found, using defaults");
    }
    info!(
        host = config.server.host,
        port = config.server.port,
        static_dir = ?config.server.static_dir,
        analytics_interval_ms = config.analytics.interval_ms,
        "Configuration resolved"
    );

    // 3. Build the dispatcher.
    let shutdown = CancellationToken::new();
    let store = Arc::new(StateStore::new());
    let broadcaster = Broadcaster::new();
    let control = Arc::new(ScenarioControl::with_root(shutdown.child_token()));
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        broadcaster.clone(),
        Arc::clone(&control),
        config.scenario.clone(),
    );

    // 4. Spawn the analytics ticker.
    let ticker = tokio::spawn(analytics::run_analytics_ticker(
        store,
        broadcaster,
        config.analytics.interval(),
        shutdown.clone(),
    ));

    // 5. Serve until Ctrl-C.
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        info!("Shutdown requested");
        signal_token.cancel();
    });

    let state = Arc::new(
        AppState::new(dispatcher).with_static_dir(config.server.static_dir.clone()),
    );
    let served = clearpath_api::start_server(&config.server, state, shutdown.clone()).await;

    // Whatever ended the server, stop the background tasks too.
    control.shutdown();
    shutdown.cancel();
    if let Err(e) = ticker.await {
        warn!("Analytics ticker ended abnormally: {e}");
    }

    served?;
    info!("clearpath-server stopped");
    Ok(())
}

/// Load configuration from [`CONFIG_PATH`], or defaults if it is absent.
///
/// Environment overrides apply in both cases. The flag reports whether
/// the file was read.
fn load_config() -> Result<(ClearPathConfig, bool), StartupError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((ClearPathConfig::from_file(config_path)?, true))
    } else {
        let mut config = ClearPathConfig::default();
        config.server.apply_env_overrides()?;
        Ok((config, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingConfig) -> Result<(), StartupError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_unset) => {
            EnvFilter::try_new(&logging.level).map_err(|e| StartupError::LogFilter {
                level: logging.level.clone(),
                message: e.to_string(),
            })?
        }
    };

    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
    }
    Ok(())
}
