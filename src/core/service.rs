// src/core/service.rs

//! The service facade: validates requests against the configured rank type
//! range and dispatches them to the rank worker. Validation failures are
//! returned as typed codes, never as errors, and never reach the store.

use crate::core::RankError;
use crate::core::metrics;
use crate::core::rank::RankResult;
use crate::core::worker::RankHandle;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{debug, error};

/// The result code carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetCode {
    #[default]
    Ok,
    /// The operation targeted something that does not exist.
    Error,
    /// The rank type is outside the configured range.
    RankTypeErr,
    /// The begin rank is not a positive number.
    RankBeginInputErr,
    /// The rank worker is not running.
    Unavailable,
}

impl RetCode {
    fn label(self) -> &'static str {
        match self {
            RetCode::Ok => "ok",
            RetCode::Error => "error",
            RetCode::RankTypeErr => "rank_type_err",
            RetCode::RankBeginInputErr => "rank_begin_input_err",
            RetCode::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRankRequest {
    pub rank_type: i32,
    pub begin_rank: i64,
    /// A negative count selects an empty window.
    pub count: i64,
    #[serde(default)]
    pub me: String,
    #[serde(default)]
    pub reverse: bool,
}

/// The new score of a member. `then` breaks ties between equal scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankChange {
    pub score: u64,
    #[serde(default)]
    pub then: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRankRequest {
    pub rank_type: i32,
    pub rank_data: IndexMap<String, RankChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRankMemsRequest {
    pub rank_type: i32,
    pub mems: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRankByOffsetRequest {
    pub rank_type: i32,
    pub me: String,
    /// A negative offset selects an empty window.
    pub offset: i64,
    #[serde(default)]
    pub reverse: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRankRequest {
    pub rank_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankResponse {
    pub code: RetCode,
    #[serde(flatten)]
    pub result: RankResult,
}

impl RankResponse {
    fn rejected(code: RetCode) -> Self {
        Self {
            code,
            result: RankResult::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonResponse {
    pub code: RetCode,
}

impl CommonResponse {
    fn with_code(code: RetCode) -> Self {
        Self { code }
    }
}

#[derive(Debug, Clone)]
pub struct RankService {
    handle: RankHandle,
    type_range: RangeInclusive<i32>,
}

impl RankService {
    pub fn new(handle: RankHandle, type_range: RangeInclusive<i32>) -> Self {
        Self { handle, type_range }
    }

    fn check_rank_type(&self, rank_type: i32) -> Result<(), RetCode> {
        if self.type_range.contains(&rank_type) {
            Ok(())
        } else {
            debug!(
                "Rejecting rank type {} outside {:?}",
                rank_type, self.type_range
            );
            Err(reject(RetCode::RankTypeErr))
        }
    }

    pub async fn get_rank(&self, req: GetRankRequest) -> RankResponse {
        if let Err(code) = self.check_rank_type(req.rank_type) {
            return RankResponse::rejected(code);
        }
        if req.begin_rank <= 0 {
            return RankResponse::rejected(reject(RetCode::RankBeginInputErr));
        }
        let begin_rank = clamp_u32(req.begin_rank);
        let result = self
            .handle
            .get_rank(req.rank_type, begin_rank, clamp_u32(req.count), req.me, req.reverse)
            .await;
        rank_response(result)
    }

    pub async fn update_rank(&self, req: UpdateRankRequest) -> CommonResponse {
        if let Err(code) = self.check_rank_type(req.rank_type) {
            return CommonResponse::with_code(code);
        }
        let batch = req
            .rank_data
            .into_iter()
            .map(|(member, change)| (member, (change.score, change.then)))
            .collect();
        common_response(self.handle.update_scores(req.rank_type, batch).await)
    }

    pub async fn delete_rank_mems(&self, req: DeleteRankMemsRequest) -> CommonResponse {
        if let Err(code) = self.check_rank_type(req.rank_type) {
            return CommonResponse::with_code(code);
        }
        common_response(self.handle.delete_members(req.rank_type, req.mems).await)
    }

    pub async fn get_rank_by_offset(&self, req: GetRankByOffsetRequest) -> RankResponse {
        if let Err(code) = self.check_rank_type(req.rank_type) {
            return RankResponse::rejected(code);
        }
        let result = self
            .handle
            .get_rank_by_offset(req.rank_type, req.me, clamp_u32(req.offset), req.reverse)
            .await;
        rank_response(result)
    }

    pub async fn delete_rank(&self, req: DeleteRankRequest) -> CommonResponse {
        if let Err(code) = self.check_rank_type(req.rank_type) {
            return CommonResponse::with_code(code);
        }
        common_response(self.handle.delete_rank_type(req.rank_type).await)
    }
}

/// Saturates a client-supplied window bound into the worker's range.
fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn reject(code: RetCode) -> RetCode {
    metrics::REJECTED_REQUESTS_TOTAL
        .with_label_values(&[code.label()])
        .inc();
    code
}

fn rank_response(result: Result<RankResult, RankError>) -> RankResponse {
    match result {
        Ok(result) => RankResponse {
            code: RetCode::Ok,
            result,
        },
        Err(e) => {
            error!("Rank query failed: {}", e);
            RankResponse::rejected(RetCode::Unavailable)
        }
    }
}

fn common_response(result: Result<(), RankError>) -> CommonResponse {
    match result {
        Ok(()) => CommonResponse::with_code(RetCode::Ok),
        Err(RankError::RankTypeNotFound(_)) => CommonResponse::with_code(RetCode::Error),
        Err(e) => {
            error!("Rank mutation failed: {}", e);
            CommonResponse::with_code(RetCode::Unavailable)
        }
    }
}
