//! dns-svc-lifecycle entry point.
//!
//! Acts as a local host for one process instance: fires the start hook,
//! arms the idle timer, and forwards OS termination signals to the stop
//! hook. Exits once teardown has finished.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use dns_svc_lifecycle::app_state::AppState;
use dns_svc_lifecycle::config::{LogFormat, SvcConfig};
use dns_svc_lifecycle::domain::Topic;
use dns_svc_lifecycle::service::DefaultServiceFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SvcConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let state = Arc::new(AppState::new(&config, Arc::new(DefaultServiceFactory)));
    tracing::info!(
        instance_id = %state.instance_id(),
        upstream = %config.upstream,
        cache_size = config.cache_size,
        "starting dns-svc-lifecycle"
    );

    state
        .start()
        .await
        .context("bootstrapping services; instance unusable")?;
    state.wait_steady().await?;
    state.renew_idle_timeout(config.idle_timeout_ms);

    tokio::select! {
        result = wait_for_termination() => {
            result.context("registering signal handlers")?;
            state.stop(None);
        }
        _ = state.bus().when(&Topic::STOP) => {}
    }

    state.wait_closed().await;
    tracing::info!(instance_id = %state.instance_id(), "instance closed");
    Ok(())
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = sigterm.recv() => Ok(()),
    }
}

/// Completes on Ctrl-C.
#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
