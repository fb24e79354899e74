// src/server/http.rs

//! The HTTP/JSON surface of the rank service, plus the Prometheus endpoint.

use crate::core::RankService;
use crate::core::metrics::gather_metrics;
use crate::core::service::{
    CommonResponse, DeleteRankMemsRequest, DeleteRankRequest, GetRankByOffsetRequest,
    GetRankRequest, RankResponse, UpdateRankRequest,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

/// Builds the router. `/metrics` is only mounted when enabled.
pub fn router(service: RankService, metrics_enabled: bool) -> Router {
    let router = Router::new()
        .route("/rank/get", post(get_rank))
        .route("/rank/update", post(update_rank))
        .route("/rank/delete_mems", post(delete_rank_mems))
        .route("/rank/get_by_offset", post(get_rank_by_offset))
        .route("/rank/delete", post(delete_rank))
        .with_state(service);

    if metrics_enabled {
        router.route("/metrics", get(metrics_handler))
    } else {
        router
    }
}

async fn get_rank(
    State(service): State<RankService>,
    Json(req): Json<GetRankRequest>,
) -> Json<RankResponse> {
    Json(service.get_rank(req).await)
}

async fn update_rank(
    State(service): State<RankService>,
    Json(req): Json<UpdateRankRequest>,
) -> Json<CommonResponse> {
    Json(service.update_rank(req).await)
}

async fn delete_rank_mems(
    State(service): State<RankService>,
    Json(req): Json<DeleteRankMemsRequest>,
) -> Json<CommonResponse> {
    Json(service.delete_rank_mems(req).await)
}

async fn get_rank_by_offset(
    State(service): State<RankService>,
    Json(req): Json<GetRankByOffsetRequest>,
) -> Json<RankResponse> {
    Json(service.get_rank_by_offset(req).await)
}

async fn delete_rank(
    State(service): State<RankService>,
    Json(req): Json<DeleteRankRequest>,
) -> Json<CommonResponse> {
    Json(service.delete_rank(req).await)
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
