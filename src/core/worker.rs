// src/core/worker.rs

//! The single logical worker that owns the [`RankStore`].
//!
//! Requests from the service facade and persistence outcomes from the writer
//! task are consumed by one loop, one at a time. Nothing else touches the
//! store, so the ranking indexes need no locking and every caller observes
//! its own writes immediately.

use crate::core::RankError;
use crate::core::metrics;
use crate::core::persistence::PersistOutcome;
use crate::core::rank::{RankResult, RankStore, query};
use indexmap::IndexMap;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

/// The capacity of the request queue between the facade and the worker.
pub const REQUEST_QUEUE_CAPACITY: usize = 4096;

/// A unit of work for the rank worker. Each carries the channel its reply is sent on.
#[derive(Debug)]
pub enum RankRequest {
    GetRank {
        rank_type: i32,
        begin_rank: u32,
        count: u32,
        me: String,
        reverse: bool,
        reply: oneshot::Sender<RankResult>,
    },
    GetRankByOffset {
        rank_type: i32,
        me: String,
        offset: u32,
        reverse: bool,
        reply: oneshot::Sender<RankResult>,
    },
    UpdateScores {
        rank_type: i32,
        batch: IndexMap<String, (u64, u64)>,
        reply: oneshot::Sender<()>,
    },
    DeleteMembers {
        rank_type: i32,
        members: Vec<String>,
        reply: oneshot::Sender<()>,
    },
    DeleteRankType {
        rank_type: i32,
        reply: oneshot::Sender<Result<(), RankError>>,
    },
}

impl RankRequest {
    fn method(&self) -> &'static str {
        match self {
            RankRequest::GetRank { .. } => "get_rank",
            RankRequest::GetRankByOffset { .. } => "get_rank_by_offset",
            RankRequest::UpdateScores { .. } => "update_rank",
            RankRequest::DeleteMembers { .. } => "delete_rank_mems",
            RankRequest::DeleteRankType { .. } => "delete_rank",
        }
    }
}

pub struct RankWorker {
    store: RankStore,
    request_rx: mpsc::Receiver<RankRequest>,
    outcome_rx: mpsc::UnboundedReceiver<PersistOutcome>,
}

impl RankWorker {
    /// Creates the worker around a loaded store, returning the handle used to reach it.
    pub fn new(
        store: RankStore,
        outcome_rx: mpsc::UnboundedReceiver<PersistOutcome>,
    ) -> (Self, RankHandle) {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let worker = Self {
            store,
            request_rx,
            outcome_rx,
        };
        (worker, RankHandle { request_tx })
    }

    /// Runs until shutdown is signalled or every handle has been dropped.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "Rank worker started with {} rank types.",
            self.store.rank_types().len()
        );
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Rank worker shutting down.");
                    break;
                }
                Some(outcome) = self.outcome_rx.recv() => {
                    self.store.on_persisted(outcome);
                }
                maybe_request = self.request_rx.recv() => {
                    match maybe_request {
                        Some(request) => self.handle(request),
                        None => {
                            info!("All rank handles dropped, worker shutting down.");
                            break;
                        }
                    }
                }
            }
        }

        // Report outcomes the writer already delivered.
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.store.on_persisted(outcome);
        }
    }

    fn handle(&mut self, request: RankRequest) {
        let method = request.method();
        let started = Instant::now();
        metrics::REQUESTS_TOTAL.with_label_values(&[method]).inc();

        // A dropped reply receiver means the caller went away; the mutation still stands.
        match request {
            RankRequest::GetRank {
                rank_type,
                begin_rank,
                count,
                me,
                reverse,
                reply,
            } => {
                let index = self.store.index(rank_type);
                let _ = reply.send(query::rank_window(index, begin_rank, count, &me, reverse));
            }
            RankRequest::GetRankByOffset {
                rank_type,
                me,
                offset,
                reverse,
                reply,
            } => {
                let index = self.store.index(rank_type);
                let _ = reply.send(query::rank_around_member(index, &me, offset, reverse));
            }
            RankRequest::UpdateScores {
                rank_type,
                batch,
                reply,
            } => {
                self.store.update_scores(rank_type, batch);
                let _ = reply.send(());
            }
            RankRequest::DeleteMembers {
                rank_type,
                members,
                reply,
            } => {
                self.store.delete_members(rank_type, members);
                let _ = reply.send(());
            }
            RankRequest::DeleteRankType { rank_type, reply } => {
                let _ = reply.send(self.store.delete_rank_type(rank_type));
            }
        }

        let elapsed = started.elapsed();
        metrics::REQUEST_LATENCY_SECONDS.observe(elapsed.as_secs_f64());
        debug!("Handled {} in {:?}", method, elapsed);
    }
}

/// A cloneable handle that submits requests to the rank worker and awaits replies.
#[derive(Debug, Clone)]
pub struct RankHandle {
    request_tx: mpsc::Sender<RankRequest>,
}

impl RankHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RankRequest,
    ) -> Result<T, RankError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RankError::WorkerUnavailable)?;
        reply_rx.await.map_err(|_| RankError::WorkerUnavailable)
    }

    pub async fn get_rank(
        &self,
        rank_type: i32,
        begin_rank: u32,
        count: u32,
        me: String,
        reverse: bool,
    ) -> Result<RankResult, RankError> {
        self.call(|reply| RankRequest::GetRank {
            rank_type,
            begin_rank,
            count,
            me,
            reverse,
            reply,
        })
        .await
    }

    pub async fn get_rank_by_offset(
        &self,
        rank_type: i32,
        me: String,
        offset: u32,
        reverse: bool,
    ) -> Result<RankResult, RankError> {
        self.call(|reply| RankRequest::GetRankByOffset {
            rank_type,
            me,
            offset,
            reverse,
            reply,
        })
        .await
    }

    pub async fn update_scores(
        &self,
        rank_type: i32,
        batch: IndexMap<String, (u64, u64)>,
    ) -> Result<(), RankError> {
        self.call(|reply| RankRequest::UpdateScores {
            rank_type,
            batch,
            reply,
        })
        .await
    }

    pub async fn delete_members(
        &self,
        rank_type: i32,
        members: Vec<String>,
    ) -> Result<(), RankError> {
        self.call(|reply| RankRequest::DeleteMembers {
            rank_type,
            members,
            reply,
        })
        .await
    }

    pub async fn delete_rank_type(&self, rank_type: i32) -> Result<(), RankError> {
        self.call(|reply| RankRequest::DeleteRankType { rank_type, reply })
            .await?
    }
}
