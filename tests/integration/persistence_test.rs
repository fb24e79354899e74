// tests/integration/persistence_test.rs

//! Integration tests for write-through persistence and reloading on startup

use super::test_helpers::{TestContext, ranked, test_config};
use bytes::Bytes;
use rankserver::core::metrics::PERSISTENCE_FAILURES_TOTAL;
use rankserver::core::persistence::codec::decode_record;
use rankserver::core::persistence::{MemoryGateway, PersistenceGateway};
use rankserver::core::rank::Record;
use rankserver::core::service::RetCode;
use rankserver::server::RankRuntime;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_updates_are_written_through() {
    let ctx = TestContext::new().await;
    ctx.update(7, &[("A", 100, 5), ("B", 100, 3)]).await;
    // One registry write and one batch write.
    ctx.wait_for_writes(2).await;

    assert_eq!(
        ctx.gateway.blob_snapshot("test_rankType"),
        Some(Bytes::from_static(b"[7]"))
    );
    let hash = ctx.gateway.hash_snapshot("rank_7").unwrap();
    assert_eq!(hash.len(), 2);
    assert_eq!(
        decode_record("A", &hash["A"]).unwrap(),
        Record::new("A", 100, 5)
    );

    ctx.delete_mems(7, &["A"]).await;
    ctx.wait_for_writes(3).await;
    let hash = ctx.gateway.hash_snapshot("rank_7").unwrap();
    assert!(!hash.contains_key("A"));
}

#[tokio::test]
async fn test_state_survives_restart() {
    let ctx = TestContext::new().await;
    ctx.update(7, &[("A", 100, 5), ("B", 100, 3), ("C", 90, 0)]).await;
    ctx.update(8, &[("X", 1, 1)]).await;
    ctx.update(7, &[("C", 95, 0)]).await;
    ctx.delete_mems(7, &["B"]).await;
    let before = ctx.get(7, 1, 10, "C", true).await;

    let ctx = ctx.restart().await;
    let after = ctx.get(7, 1, 10, "C", true).await;
    assert_eq!(after, before);
    assert_eq!(ranked(&after), vec![("A".to_string(), 0), ("C".to_string(), 1)]);
    assert_eq!(ctx.get(8, 1, 10, "X", false).await.result.total, 1);
}

#[tokio::test]
async fn test_deleted_type_stays_deleted_after_restart() {
    let ctx = TestContext::new().await;
    ctx.update(5, &[("A", 1, 0)]).await;
    assert_eq!(ctx.delete_rank(5).await.code, RetCode::Ok);

    let ctx = ctx.restart().await;
    // The registry blob still names the type, but its hash is gone.
    assert_eq!(
        ctx.gateway.blob_snapshot("test_rankType"),
        Some(Bytes::from_static(b"[5]"))
    );
    assert!(!ctx.gateway.contains_key("rank_5"));
    let resp = ctx.get(5, 1, 10, "A", false).await;
    assert_eq!(resp.result.total, 0);
    assert_eq!(ctx.delete_rank(5).await.code, RetCode::Error);

    // Recreating it works and is persisted again.
    ctx.update(5, &[("B", 2, 0)]).await;
    let ctx = ctx.restart().await;
    assert_eq!(ctx.get(5, 1, 10, "", false).await.result.total, 1);
}

#[tokio::test]
async fn test_write_failures_do_not_affect_memory() {
    let ctx = TestContext::new().await;
    let failures = || PERSISTENCE_FAILURES_TOTAL.with_label_values(&["hash_set_many"]).get();
    let before = failures();

    ctx.gateway.set_fail_writes(true);
    let resp = ctx.update(4, &[("A", 10, 0), ("B", 20, 0)]).await;
    assert_eq!(resp.code, RetCode::Ok);
    let resp = ctx.get(4, 1, 10, "A", true).await;
    assert_eq!(
        ranked(&resp),
        vec![("B".to_string(), 0), ("A".to_string(), 1)]
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while failures() <= before {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("persistence failure was not observed");
    assert!(!ctx.gateway.contains_key("rank_4"));

    // Later writes go through once the store recovers.
    ctx.gateway.set_fail_writes(false);
    ctx.update(4, &[("C", 30, 0)]).await;
    ctx.wait_for_writes(1).await;
    assert!(ctx.gateway.hash_snapshot("rank_4").unwrap().contains_key("C"));
}

#[tokio::test]
async fn test_corrupt_store_aborts_startup() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway
        .set("test_rankType", Bytes::from_static(b"[1]"))
        .await
        .unwrap();
    let mut fields = indexmap::IndexMap::new();
    fields.insert("A".to_string(), Bytes::from_static(b"garbage"));
    gateway.hash_set_many("rank_1", &fields).await.unwrap();

    let result = RankRuntime::start(&test_config(), gateway as Arc<dyn PersistenceGateway>).await;
    let err = result.err().unwrap();
    assert!(format!("{err:#}").contains("Failed to load rankings"));
}

#[tokio::test]
async fn test_unreadable_store_aborts_startup() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.set_fail_reads(true);
    let result = RankRuntime::start(&test_config(), gateway as Arc<dyn PersistenceGateway>).await;
    assert!(result.is_err());
}
