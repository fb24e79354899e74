// tests/integration/http_test.rs

//! Integration tests for the HTTP/JSON surface

use super::test_helpers::TestContext;
use rankserver::server::http;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Serves the router for `ctx` on an ephemeral port and returns its base URL.
async fn serve(ctx: &TestContext, metrics_enabled: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = http::router(ctx.service.clone(), metrics_enabled);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> Value {
    let resp = client.post(url).json(&body).send().await.unwrap();
    assert!(resp.status().is_success());
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_rank_roundtrip_over_http() {
    let ctx = TestContext::new().await;
    let base = serve(&ctx, false).await;
    let client = reqwest::Client::new();

    let resp = post(
        &client,
        format!("{base}/rank/update"),
        json!({
            "rank_type": 7,
            "rank_data": {
                "A": {"score": 100, "then": 5},
                "B": {"score": 100, "then": 3},
                "C": {"score": 90, "then": 0}
            }
        }),
    )
    .await;
    assert_eq!(resp, json!({"code": "Ok"}));

    let resp = post(
        &client,
        format!("{base}/rank/get"),
        json!({"rank_type": 7, "begin_rank": 1, "count": 2, "me": "B", "reverse": true}),
    )
    .await;
    assert_eq!(
        resp,
        json!({
            "code": "Ok",
            "ranks": [
                {"id": "A", "score": 100, "then": 5, "rank": 0},
                {"id": "B", "score": 100, "then": 3, "rank": 1}
            ],
            "top": {"id": "A", "score": 100, "then": 5, "rank": 0},
            "me": {"id": "B", "score": 100, "then": 3, "rank": 1},
            "total_rank_num": 3
        })
    );

    let resp = post(
        &client,
        format!("{base}/rank/get_by_offset"),
        json!({"rank_type": 7, "me": "A", "offset": 1}),
    )
    .await;
    assert_eq!(resp["ranks"][0]["id"], "B");
    assert_eq!(resp["ranks"][1]["id"], "A");
    assert_eq!(resp["me"]["rank"], 2);

    let resp = post(
        &client,
        format!("{base}/rank/delete_mems"),
        json!({"rank_type": 7, "mems": ["C"]}),
    )
    .await;
    assert_eq!(resp["code"], "Ok");

    let resp = post(
        &client,
        format!("{base}/rank/get"),
        json!({"rank_type": 7, "begin_rank": 1, "count": 3}),
    )
    .await;
    assert_eq!(resp["total_rank_num"], 2);
    assert_eq!(resp["ranks"][0]["id"], "B");

    let resp = post(&client, format!("{base}/rank/delete"), json!({"rank_type": 7})).await;
    assert_eq!(resp["code"], "Ok");
    let resp = post(&client, format!("{base}/rank/delete"), json!({"rank_type": 7})).await;
    assert_eq!(resp["code"], "Error");
}

#[tokio::test]
async fn test_validation_codes_over_http() {
    let ctx = TestContext::new().await;
    let base = serve(&ctx, false).await;
    let client = reqwest::Client::new();

    let resp = post(
        &client,
        format!("{base}/rank/get"),
        json!({"rank_type": 0, "begin_rank": 1, "count": 1}),
    )
    .await;
    assert_eq!(resp["code"], "RankTypeErr");
    assert_eq!(resp["total_rank_num"], 0);
    assert!(resp["top"].is_null());

    let resp = post(
        &client,
        format!("{base}/rank/get"),
        json!({"rank_type": 1, "begin_rank": 0, "count": 1}),
    )
    .await;
    assert_eq!(resp["code"], "RankBeginInputErr");

    ctx.update(1, &[("A", 1, 0)]).await;
    let resp = post(
        &client,
        format!("{base}/rank/get"),
        json!({"rank_type": 1, "begin_rank": 1, "count": -1, "me": "A"}),
    )
    .await;
    assert_eq!(resp["code"], "Ok");
    assert_eq!(resp["ranks"], json!([]));
    assert_eq!(resp["me"]["id"], "A");
    assert_eq!(resp["total_rank_num"], 1);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let ctx = TestContext::new().await;
    let base = serve(&ctx, false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/rank/get"))
        .json(&json!({"rank_type": "seven"}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let ctx = TestContext::new().await;
    ctx.update(1, &[("A", 1, 0)]).await;
    let client = reqwest::Client::new();

    let base = serve(&ctx, true).await;
    let resp = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body = resp.text().await.unwrap();
    assert!(body.contains("rankserver_requests_total"));

    let base = serve(&ctx, false).await;
    let resp = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}
