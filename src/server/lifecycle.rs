// src/server/lifecycle.rs

//! Runs the HTTP server and coordinates graceful shutdown.

use super::context::ServerContext;
use super::http;
use anyhow::{Result, anyhow};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Serves until SIGINT/SIGTERM or until a core task stops, then shuts down.
pub async fn run(ctx: ServerContext) -> Result<()> {
    let ServerContext {
        config,
        mut runtime,
        listener,
    } = ctx;

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;

    let app = http::router(runtime.service.clone(), config.metrics.enabled);
    if config.metrics.enabled {
        info!("Prometheus metrics exposed on /metrics");
    }

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stop_rx.await.ok();
                info!("HTTP server shutting down.");
            })
            .await
    });

    let mut failure = None;
    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown."),
        _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown."),
        Some(res) = runtime.tasks.join_next() => {
            let msg = match res {
                Ok(()) => "A ranking core task finished unexpectedly.".to_string(),
                Err(e) => format!("A ranking core task panicked: {e:?}"),
            };
            error!("CRITICAL: {} Shutting down.", msg);
            failure = Some(msg);
        }
    }

    // Stop taking requests first so nothing reaches the worker mid-shutdown.
    let _ = stop_tx.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("HTTP server finished with error: {}", e),
        Err(e) => warn!("HTTP server task failed: {e:?}"),
    }

    runtime.shutdown().await;
    info!("Server shutdown complete.");

    match failure {
        Some(msg) => Err(anyhow!(msg)),
        None => Ok(()),
    }
}
