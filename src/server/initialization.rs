// src/server/initialization.rs

//! Handles server initialization: connecting the persistence gateway,
//! loading the rankings and binding the listener.

use super::context::ServerContext;
use super::runtime::RankRuntime;
use crate::config::{Config, StoreBackend};
use crate::core::persistence::{MemoryGateway, PersistenceGateway, RespGateway};
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);

    let gateway = connect_gateway(&config).await?;
    let runtime = RankRuntime::start(&config, gateway).await?;

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!(
        "Rank server listening on http://{}:{}",
        config.host, config.port
    );

    Ok(ServerContext {
        config,
        runtime,
        listener,
    })
}

/// Builds the persistence gateway selected by the configuration.
async fn connect_gateway(config: &Config) -> Result<Arc<dyn PersistenceGateway>> {
    match config.persistence.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryGateway::new())),
        StoreBackend::Resp => {
            let address = config
                .persistence
                .address
                .as_deref()
                .ok_or_else(|| anyhow!("persistence.address is not set"))?;
            let gateway = RespGateway::connect(address, config.persistence.password.clone())
                .await
                .with_context(|| format!("Failed to connect to persistence store at {address}"))?;
            Ok(Arc::new(gateway))
        }
    }
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    let [min, max] = config.rank.type_range;
    info!(
        "Server id '{}' serving rank types {} through {}.",
        config.server_id, min, max
    );
    info!(
        "Persistence backend: {:?}, queue capacity {}.",
        config.persistence.backend, config.persistence.queue_capacity
    );
}
