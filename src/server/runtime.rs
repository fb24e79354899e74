// src/server/runtime.rs

//! Assembles the ranking core: loads the store, then spawns the rank worker
//! and the persistence writer around it.

use crate::config::Config;
use crate::core::persistence::{PersistQueue, PersistenceGateway, PersistenceWriter};
use crate::core::{RankService, RankStore, RankWorker};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// How long shutdown waits for the worker and writer to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// The running ranking core and the tasks that make it up.
pub struct RankRuntime {
    pub service: RankService,
    pub shutdown_tx: broadcast::Sender<()>,
    pub tasks: JoinSet<()>,
}

impl RankRuntime {
    /// Loads persisted rankings through `gateway` and starts serving.
    /// A load failure is returned before any task is spawned.
    pub async fn start(config: &Config, gateway: Arc<dyn PersistenceGateway>) -> Result<Self> {
        let (persist, op_rx) = PersistQueue::channel(config.persistence.queue_capacity);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let store = RankStore::load(gateway.as_ref(), &config.server_id, persist)
            .await
            .context("Failed to load rankings from the persistence store")?;

        let (shutdown_tx, _) = broadcast::channel(1);
        let (worker, handle) = RankWorker::new(store, outcome_rx);
        let writer = PersistenceWriter::new(gateway, op_rx, outcome_tx);

        let mut tasks = JoinSet::new();
        tasks.spawn(writer.run(shutdown_tx.subscribe()));
        tasks.spawn(worker.run(shutdown_tx.subscribe()));
        info!("Ranking core started.");

        Ok(Self {
            service: RankService::new(handle, config.rank.type_range()),
            shutdown_tx,
            tasks,
        })
    }

    /// Signals the worker and writer to stop and waits for them.
    pub async fn shutdown(mut self) {
        if self.shutdown_tx.send(()).is_err() {
            warn!("Ranking core tasks were already stopped.");
        }
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await
        .is_err()
        {
            warn!("Timed out waiting for the ranking core to finish cleanly.");
        }
    }
}
