//! DCScribe service entry point.
//!
//! Mirrors the live state of one or more DCS game servers into `PostgreSQL`.
//! For every session in `dcscribe.yaml` the service connects to the game
//! server's NATS bridge, streams units and mark panels into time-windowed
//! batch writers, polls airbases on a timer, and rebuilds the mirror from
//! scratch whenever the connection drops.
//!
//! # Architecture
//!
//! ```text
//! NATS bridge --> NatsConsumer --> session tasks --> accumulators --> PostgreSQL
//!                                      ^
//!                       SessionSupervisor (one per session)
//! ```
//!
//! Environment:
//!
//! - `DCSCRIBE_CONFIG` -- config file path (default `dcscribe.yaml`)
//! - `DATABASE_PASSWORD_<SHORT_NAME>` -- per-session password override
//! - `RUST_LOG` -- log filter (default `info`)
//! - `LOG_FORMAT=json` -- structured JSON logs

mod nats;
mod wire;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use dcscribe_core::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DatabaseConfig};
use dcscribe_core::{CancelScope, Config, Connector, build_supervisors, run_sessions};
use dcscribe_db::{PostgresConfig, PostgresPool, Sink};
use dcscribe_symbology::Encyclopedia;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::nats::NatsConnector;

/// Application entry point.
///
/// Initializes logging, loads the configuration and the unit encyclopedia,
/// then supervises every configured session until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the configuration or the bundled encyclopedia
/// cannot be loaded.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("dcscribe starting");

    let path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = Config::from_file(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    info!(
        path = %path.display(),
        sessions = config.sessions.len(),
        "configuration loaded"
    );

    let encyclopedia =
        Arc::new(Encyclopedia::bundled().context("failed to load unit encyclopedia")?);
    info!(entries = encyclopedia.len(), "encyclopedia loaded");

    let supervisors = build_supervisors(
        &config,
        &encyclopedia,
        |session| Arc::new(NatsConnector::new(session)) as Arc<dyn Connector>,
        |session| Sink::postgres(&PostgresPool::connect_lazy(&postgres_config(&session.database))),
    );

    let shutdown = CancelScope::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    run_sessions(supervisors, shutdown).await;
    info!("dcscribe stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn postgres_config(database: &DatabaseConfig) -> PostgresConfig {
    PostgresConfig::new(
        &database.host,
        database.port,
        &database.name,
        &database.username,
        &database.password,
    )
}

async fn cancel_on_signal(shutdown: CancelScope) {
    wait_for_signal().await;
    info!("shutdown signal received, stopping sessions");
    shutdown.cancel();
}

/// Resolve on Ctrl-C or SIGTERM. A listener that cannot be installed never
/// fires, so the service keeps running.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    tokio::select! {
        () = ctrl_c() => {}
        () = terminate => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
