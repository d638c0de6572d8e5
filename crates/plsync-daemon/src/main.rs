//! plsync Daemon - scheduled playlist reconciliation
//!
//! This binary runs as a long-lived (e.g. systemd user) service and:
//! - Loads the YAML configuration and the action file
//! - Optionally runs every action once at startup
//! - Runs each action on its own recurring timer
//! - Stops on SIGTERM/SIGINT without waiting for in-flight runs
//!
//! # Architecture
//!
//! The daemon wires the Spotify catalog provider into the reconciliation
//! engine and hands the action list to the dispatcher. The scheduler loop is
//! controlled by a `CancellationToken` that is triggered on receipt of
//! SIGTERM or SIGINT.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use plsync_core::{
    action_file::load_actions,
    config::{Config, LoggingConfig},
};
use plsync_engine::{dispatcher::ActionDispatcher, engine::ReconciliationEngine};
use plsync_spotify::{auth::EnvTokenProvider, provider::SpotifyCatalogProvider};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// DaemonService
// ============================================================================

/// Main daemon service that wires configuration, catalog and scheduler
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// Token for signalling shutdown to the scheduler
    shutdown: CancellationToken,
}

impl DaemonService {
    fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// Runs the daemon until shutdown
    ///
    /// 1. Validates the configuration and loads the action file
    /// 2. Builds the catalog provider, engine and dispatcher
    /// 3. Runs every action once when `scheduler.run_on_start` is set
    /// 4. Schedules all actions until the shutdown token fires
    async fn run(&self) -> Result<()> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            for e in &errors {
                error!(field = %e.field, message = %e.message, "Invalid configuration");
            }
            anyhow::bail!("Invalid configuration ({} error(s))", errors.len());
        }

        let actions_file = &self.config.actions.file;
        let actions = load_actions(actions_file)
            .with_context(|| format!("Failed to load actions from {}", actions_file.display()))?;
        info!(count = actions.len(), file = %actions_file.display(), "Loaded actions");

        let credentials =
            Arc::new(EnvTokenProvider::from_env().context("No catalog access token available")?);
        let provider = Arc::new(
            SpotifyCatalogProvider::from_config(&self.config, credentials)
                .context("Failed to create catalog provider")?,
        );
        let engine = Arc::new(ReconciliationEngine::new(provider));
        let dispatcher = ActionDispatcher::new(engine)
            .with_tick(Duration::from_secs(self.config.scheduler.tick_seconds));

        if self.config.scheduler.run_on_start {
            info!("Running all actions once before scheduling");
            tokio::select! {
                summary = dispatcher.run_once(&actions) => {
                    if !summary.is_success() {
                        warn!(
                            succeeded = summary.succeeded,
                            failed = summary.failed,
                            "Initial run had failures, continuing with schedule"
                        );
                    }
                }
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received during initial run");
                    return Ok(());
                }
            }
        }

        dispatcher.schedule(actions, self.shutdown.clone()).await;
        Ok(())
    }
}

// ============================================================================
// Shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

/// Missing file means defaults; a malformed one stops startup
fn load_config(path: &Path) -> Result<Config> {
    Config::load_or_default(path)
}

/// Installs the global subscriber; `RUST_LOG` overrides `logging.level`
fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    // Runs before tracing is up, so a bad file surfaces through main's error
    let config = load_config(&config_path)?;

    init_tracing(&config.logging);
    info!(config_path = %config_path.display(), "plsync daemon starting (plsyncd)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token);
    let result = service.run().await;

    match &result {
        Ok(()) => info!("plsync daemon shut down"),
        Err(e) => error!(error = %format!("{e:#}"), "plsync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
