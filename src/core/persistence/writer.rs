// src/core/persistence/writer.rs

//! Implements the write-through persistence pipeline.
//!
//! The rank store enqueues [`PersistOp`]s without waiting. A single
//! [`PersistenceWriter`] task applies them to the gateway in FIFO order and
//! posts every [`PersistOutcome`] back to the rank worker, which is the only
//! place outcomes are observed.

use super::gateway::PersistenceGateway;
use crate::core::RankError;
use bytes::Bytes;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::{
    broadcast,
    mpsc::{self, error::TrySendError},
};
use tracing::{debug, info, warn};

/// The default capacity of the persistence queue.
/// Large enough that a slow store never pushes back on the worker in practice.
pub const DEFAULT_QUEUE_CAPACITY: usize = 65536;

/// A single gateway mutation staged by the rank store.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOp {
    Set {
        key: String,
        value: Bytes,
    },
    HashSetMany {
        key: String,
        fields: IndexMap<String, Bytes>,
    },
    HashDelete {
        key: String,
        fields: Vec<String>,
    },
    Delete {
        key: String,
    },
}

impl PersistOp {
    pub fn key(&self) -> &str {
        match self {
            PersistOp::Set { key, .. }
            | PersistOp::HashSetMany { key, .. }
            | PersistOp::HashDelete { key, .. }
            | PersistOp::Delete { key } => key,
        }
    }

    /// A short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PersistOp::Set { .. } => "set",
            PersistOp::HashSetMany { .. } => "hash_set_many",
            PersistOp::HashDelete { .. } => "hash_delete",
            PersistOp::Delete { .. } => "delete",
        }
    }

    pub async fn apply(&self, gateway: &dyn PersistenceGateway) -> Result<(), RankError> {
        match self {
            PersistOp::Set { key, value } => gateway.set(key, value.clone()).await,
            PersistOp::HashSetMany { key, fields } => gateway.hash_set_many(key, fields).await,
            PersistOp::HashDelete { key, fields } => gateway.hash_delete(key, fields).await,
            PersistOp::Delete { key } => gateway.delete(key).await,
        }
    }
}

/// The result of applying one [`PersistOp`].
#[derive(Debug, Clone, PartialEq)]
pub struct PersistOutcome {
    pub op: PersistOp,
    pub result: Result<(), RankError>,
}

/// Receives persistence outcomes on the rank worker.
///
/// Failures never roll back in-memory state; an observer is the place to
/// count them, alert, or feed a retry queue.
pub trait PersistenceObserver: Send + Sync {
    fn on_failure(&self, op: &PersistOp, error: &RankError);

    fn on_success(&self, _op: &PersistOp) {}
}

/// The default observer: logs the failure and counts it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl PersistenceObserver for LoggingObserver {
    fn on_failure(&self, op: &PersistOp, error: &RankError) {
        warn!(
            "Persistence {} on key '{}' failed: {}. In-memory state remains authoritative.",
            op.kind(),
            op.key(),
            error
        );
        crate::core::metrics::PERSISTENCE_FAILURES_TOTAL
            .with_label_values(&[op.kind()])
            .inc();
    }
}

/// The sending half of the persistence queue, held by the rank store.
#[derive(Debug, Clone)]
pub struct PersistQueue {
    sender: mpsc::Sender<PersistOp>,
}

impl PersistQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PersistOp>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Enqueues an op without waiting. On error the op is handed back with the reason.
    pub fn submit(&self, op: PersistOp) -> Result<(), (PersistOp, RankError)> {
        match self.sender.try_send(op) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(op)) => Err((op, RankError::QueueFull)),
            Err(TrySendError::Closed(op)) => Err((
                op,
                RankError::Internal("persistence writer has stopped".to_string()),
            )),
        }
    }
}

/// The background task that drains the persistence queue into the gateway.
pub struct PersistenceWriter {
    gateway: Arc<dyn PersistenceGateway>,
    op_rx: mpsc::Receiver<PersistOp>,
    outcome_tx: mpsc::UnboundedSender<PersistOutcome>,
}

impl PersistenceWriter {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        op_rx: mpsc::Receiver<PersistOp>,
        outcome_tx: mpsc::UnboundedSender<PersistOutcome>,
    ) -> Self {
        Self {
            gateway,
            op_rx,
            outcome_tx,
        }
    }

    /// Applies ops until the queue closes or shutdown is signalled.
    /// On shutdown, ops already queued are still written.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Persistence writer task started.");
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Persistence writer shutting down. Draining pending writes.");
                    self.op_rx.close();
                    while let Some(op) = self.op_rx.recv().await {
                        self.apply(op).await;
                    }
                    return;
                }
                maybe_op = self.op_rx.recv() => {
                    match maybe_op {
                        Some(op) => self.apply(op).await,
                        None => {
                            info!("Persistence queue closed, writer task shutting down.");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn apply(&self, op: PersistOp) {
        let result = op.apply(self.gateway.as_ref()).await;
        debug!("Persistence {} on '{}' finished: {:?}", op.kind(), op.key(), result);
        // The worker may already be gone during shutdown; nothing is left to notify.
        let _ = self.outcome_tx.send(PersistOutcome { op, result });
    }
}
