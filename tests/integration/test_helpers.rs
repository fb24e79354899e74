// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use rankserver::config::Config;
use rankserver::core::RankService;
use rankserver::core::persistence::{MemoryGateway, PersistenceGateway};
use rankserver::core::service::{
    CommonResponse, DeleteRankMemsRequest, DeleteRankRequest, GetRankByOffsetRequest,
    GetRankRequest, RankChange, RankResponse, UpdateRankRequest,
};
use rankserver::server::RankRuntime;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// TestContext runs a real ranking core on top of an in-memory gateway.
pub struct TestContext {
    pub gateway: Arc<MemoryGateway>,
    pub service: RankService,
    runtime: Option<RankRuntime>,
}

impl TestContext {
    /// Creates a new test context with default configuration
    pub async fn new() -> Self {
        Self::with_gateway(test_config(), Arc::new(MemoryGateway::new())).await
    }

    /// Starts a core over an existing gateway, loading whatever it holds.
    pub async fn with_gateway(config: Config, gateway: Arc<MemoryGateway>) -> Self {
        // Initialize tracing (ignore error if already initialized)
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("warn"))
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();

        let runtime = RankRuntime::start(&config, gateway.clone() as Arc<dyn PersistenceGateway>)
            .await
            .expect("Failed to start ranking core");
        Self {
            gateway,
            service: runtime.service.clone(),
            runtime: Some(runtime),
        }
    }

    /// Stops the core. Pending persistence writes are flushed first.
    pub async fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown().await;
        }
    }

    /// Shuts down and starts a fresh core over the same gateway.
    pub async fn restart(mut self) -> Self {
        self.shutdown().await;
        Self::with_gateway(test_config(), self.gateway.clone()).await
    }

    /// Waits until the gateway has applied at least `writes` writes.
    pub async fn wait_for_writes(&self, writes: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.gateway.write_count() < writes {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("persistence writes did not land in time");
    }

    pub async fn update(&self, rank_type: i32, entries: &[(&str, u64, u64)]) -> CommonResponse {
        let rank_data = entries
            .iter()
            .map(|(member, score, then)| {
                (
                    member.to_string(),
                    RankChange {
                        score: *score,
                        then: *then,
                    },
                )
            })
            .collect();
        self.service
            .update_rank(UpdateRankRequest {
                rank_type,
                rank_data,
            })
            .await
    }

    pub async fn get(
        &self,
        rank_type: i32,
        begin_rank: i64,
        count: i64,
        me: &str,
        reverse: bool,
    ) -> RankResponse {
        self.service
            .get_rank(GetRankRequest {
                rank_type,
                begin_rank,
                count,
                me: me.to_string(),
                reverse,
            })
            .await
    }

    pub async fn around(&self, rank_type: i32, me: &str, offset: i64, reverse: bool) -> RankResponse {
        self.service
            .get_rank_by_offset(GetRankByOffsetRequest {
                rank_type,
                me: me.to_string(),
                offset,
                reverse,
            })
            .await
    }

    pub async fn delete_mems(&self, rank_type: i32, mems: &[&str]) -> CommonResponse {
        self.service
            .delete_rank_mems(DeleteRankMemsRequest {
                rank_type,
                mems: mems.iter().map(|m| m.to_string()).collect(),
            })
            .await
    }

    pub async fn delete_rank(&self, rank_type: i32) -> CommonResponse {
        self.service
            .delete_rank(DeleteRankRequest { rank_type })
            .await
    }
}

/// The configuration every test core runs with.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server_id = "test".to_string();
    config.persistence.queue_capacity = 1024;
    config
}

/// Flattens a response window into `(member, rank)` pairs.
pub fn ranked(resp: &RankResponse) -> Vec<(String, u32)> {
    resp.result
        .ranks
        .iter()
        .map(|i| (i.member.clone(), i.position))
        .collect()
}
