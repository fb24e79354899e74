// tests/integration/service_test.rs

//! Integration tests for the rank service facade running on a live worker

use super::test_helpers::{TestContext, ranked};
use rankserver::core::rank::RankItem;
use rankserver::core::service::RetCode;

fn item(member: &str, score: u64, then: u64, rank: u32) -> RankItem {
    RankItem {
        member: member.to_string(),
        score,
        tiebreak: then,
        position: rank,
    }
}

fn pairs(expected: &[(&str, u32)]) -> Vec<(String, u32)> {
    expected.iter().map(|(m, r)| (m.to_string(), *r)).collect()
}

async fn scenario() -> TestContext {
    let ctx = TestContext::new().await;
    let resp = ctx
        .update(7, &[("A", 100, 5), ("B", 100, 3), ("C", 90, 0)])
        .await;
    assert_eq!(resp.code, RetCode::Ok);
    ctx
}

#[tokio::test]
async fn test_window_scenario_descending() {
    let ctx = scenario().await;
    let resp = ctx.get(7, 1, 2, "B", true).await;
    assert_eq!(resp.code, RetCode::Ok);
    assert_eq!(ranked(&resp), pairs(&[("A", 0), ("B", 1)]));
    assert_eq!(resp.result.top, Some(item("A", 100, 5, 0)));
    assert_eq!(resp.result.me, Some(item("B", 100, 3, 1)));
    assert_eq!(resp.result.total, 3);
}

#[tokio::test]
async fn test_window_scenario_ascending() {
    let ctx = scenario().await;
    let resp = ctx.get(7, 1, 3, "", false).await;
    assert_eq!(ranked(&resp), pairs(&[("C", 0), ("B", 1), ("A", 2)]));
    assert_eq!(resp.result.me, None);
}

#[tokio::test]
async fn test_delete_members_scenario() {
    let ctx = scenario().await;
    assert_eq!(ctx.delete_mems(7, &["C"]).await.code, RetCode::Ok);
    let resp = ctx.get(7, 1, 3, "", false).await;
    assert_eq!(ranked(&resp), pairs(&[("B", 0), ("A", 1)]));
    assert_eq!(resp.result.total, 2);
}

#[tokio::test]
async fn test_reads_see_writes_immediately() {
    let ctx = scenario().await;
    ctx.update(7, &[("C", 500, 0)]).await;
    let resp = ctx.get(7, 1, 1, "C", true).await;
    assert_eq!(ranked(&resp), pairs(&[("C", 0)]));
    assert_eq!(resp.result.me, Some(item("C", 500, 0, 0)));
}

#[tokio::test]
async fn test_missing_tiebreak_defaults_to_zero() {
    let ctx = TestContext::new().await;
    let update: rankserver::core::service::UpdateRankRequest = serde_json::from_str(
        r#"{"rank_type": 2, "rank_data": {"x": {"score": 10}, "y": {"score": 10, "then": 1}}}"#,
    )
    .unwrap();
    assert_eq!(ctx.service.update_rank(update).await.code, RetCode::Ok);
    let resp = ctx.get(2, 1, 10, "x", false).await;
    assert_eq!(ranked(&resp), pairs(&[("x", 0), ("y", 1)]));
    assert_eq!(resp.result.me, Some(item("x", 10, 0, 0)));
}

#[tokio::test]
async fn test_get_by_offset() {
    let ctx = TestContext::new().await;
    let entries: Vec<(String, u64)> = (0..10).map(|i| (format!("p{i}"), i * 10)).collect();
    let refs: Vec<(&str, u64, u64)> = entries.iter().map(|(m, s)| (m.as_str(), *s, 0)).collect();
    ctx.update(3, &refs).await;

    // p5 is at ascending position 5: window [3, 6].
    let resp = ctx.around(3, "p5", 2, false).await;
    assert_eq!(resp.code, RetCode::Ok);
    assert_eq!(
        ranked(&resp),
        pairs(&[("p3", 3), ("p4", 4), ("p5", 5), ("p6", 6)])
    );
    assert_eq!(resp.result.me, Some(item("p5", 50, 0, 5)));
    assert_eq!(resp.result.top, Some(item("p0", 0, 0, 0)));
    assert_eq!(resp.result.total, 10);

    // p8 is at descending position 1: window [0, 2].
    let resp = ctx.around(3, "p8", 3, true).await;
    assert_eq!(ranked(&resp), pairs(&[("p9", 0), ("p8", 1), ("p7", 2)]));

    let resp = ctx.around(3, "nobody", 3, true).await;
    assert_eq!(resp.code, RetCode::Ok);
    assert!(resp.result.ranks.is_empty());
    assert_eq!(resp.result.total, 0);
}

#[tokio::test]
async fn test_unknown_rank_type_gives_empty_result() {
    let ctx = TestContext::new().await;
    let resp = ctx.get(50, 1, 10, "A", false).await;
    assert_eq!(resp.code, RetCode::Ok);
    assert!(resp.result.ranks.is_empty());
    assert_eq!(resp.result.top, None);
    assert_eq!(resp.result.me, None);
    assert_eq!(resp.result.total, 0);
}

#[tokio::test]
async fn test_deleted_rank_type_behaves_as_never_created() {
    let ctx = scenario().await;
    assert_eq!(ctx.delete_rank(7).await.code, RetCode::Ok);
    assert_eq!(ctx.get(7, 1, 10, "A", false).await, ctx.get(8, 1, 10, "A", false).await);
    assert_eq!(ctx.around(7, "A", 2, false).await.result.total, 0);
    assert_eq!(ctx.delete_rank(7).await.code, RetCode::Error);
    assert_eq!(ctx.delete_mems(7, &["A"]).await.code, RetCode::Ok);
}

#[tokio::test]
async fn test_validation_codes() {
    let ctx = scenario().await;
    assert_eq!(ctx.get(0, 1, 10, "", false).await.code, RetCode::RankTypeErr);
    assert_eq!(ctx.get(101, 1, 10, "", false).await.code, RetCode::RankTypeErr);
    assert_eq!(ctx.get(7, 0, 10, "", false).await.code, RetCode::RankBeginInputErr);
    assert_eq!(ctx.get(7, -3, 10, "", false).await.code, RetCode::RankBeginInputErr);
    assert_eq!(ctx.update(0, &[("Z", 1, 1)]).await.code, RetCode::RankTypeErr);
    assert_eq!(ctx.delete_mems(-1, &["A"]).await.code, RetCode::RankTypeErr);
    assert_eq!(ctx.around(1000, "A", 1, false).await.code, RetCode::RankTypeErr);
    assert_eq!(ctx.delete_rank(101).await.code, RetCode::RankTypeErr);

    // Rejected requests never touched the store.
    let resp = ctx.get(7, 1, 10, "", false).await;
    assert_eq!(resp.result.total, 3);
    assert_eq!(ctx.get(100, 1, 1, "", false).await.code, RetCode::Ok);
}

#[tokio::test]
async fn test_begin_rank_beyond_total() {
    let ctx = scenario().await;
    let resp = ctx.get(7, 4, 10, "A", false).await;
    assert_eq!(resp.code, RetCode::Ok);
    assert!(resp.result.ranks.is_empty());
    assert_eq!(resp.result.me, Some(item("A", 100, 5, 2)));
    assert_eq!(resp.result.total, 3);
}

#[tokio::test]
async fn test_negative_count_or_offset_gives_empty_window() {
    let ctx = scenario().await;

    let resp = ctx.get(7, 1, -5, "B", true).await;
    assert_eq!(resp.code, RetCode::Ok);
    assert!(resp.result.ranks.is_empty());
    assert_eq!(resp.result.top, Some(item("A", 100, 5, 0)));
    assert_eq!(resp.result.me, Some(item("B", 100, 3, 1)));
    assert_eq!(resp.result.total, 3);

    let resp = ctx.around(7, "C", -2, false).await;
    assert_eq!(resp.code, RetCode::Ok);
    assert!(resp.result.ranks.is_empty());
    assert_eq!(resp.result.top, Some(item("C", 90, 0, 0)));
    assert_eq!(resp.result.me, Some(item("C", 90, 0, 0)));
    assert_eq!(resp.result.total, 3);
}

#[tokio::test]
async fn test_concurrent_updates_are_serialized() {
    let ctx = TestContext::new().await;
    let mut tasks = Vec::new();
    for t in 0..8u64 {
        let service = ctx.service.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..50u64 {
                let mut rank_data = indexmap::IndexMap::new();
                rank_data.insert(
                    format!("t{t}-m{i}"),
                    rankserver::core::service::RankChange {
                        score: i,
                        then: t,
                    },
                );
                let resp = service
                    .update_rank(rankserver::core::service::UpdateRankRequest {
                        rank_type: 9,
                        rank_data,
                    })
                    .await;
                assert_eq!(resp.code, RetCode::Ok);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let resp = ctx.get(9, 1, 400, "t7-m49", true).await;
    assert_eq!(resp.result.total, 400);
    assert_eq!(resp.result.ranks.len(), 400);
    assert_eq!(resp.result.me, Some(item("t7-m49", 49, 7, 0)));
    let scores: Vec<(u64, u64)> = resp
        .result
        .ranks
        .iter()
        .map(|i| (i.score, i.tiebreak))
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_service_reports_unavailable_after_shutdown() {
    let mut ctx = scenario().await;
    let service = ctx.service.clone();
    ctx.shutdown().await;

    let resp = service
        .get_rank(rankserver::core::service::GetRankRequest {
            rank_type: 7,
            begin_rank: 1,
            count: 1,
            me: String::new(),
            reverse: false,
        })
        .await;
    assert_eq!(resp.code, RetCode::Unavailable);
    assert_eq!(ctx.update(7, &[("A", 1, 1)]).await.code, RetCode::Unavailable);
    // Range validation still answers first.
    assert_eq!(ctx.delete_rank(0).await.code, RetCode::RankTypeErr);
}
