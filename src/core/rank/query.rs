// src/core/rank/query.rs

//! Builds positional query responses from a ranking index.
//!
//! External ranks are 1-based; the index works with 0-based positions.
//! Positions reported in a [`RankResult`] stay 0-based.

use super::index::RankingIndex;
use super::record::RankItem;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

/// The answer to a positional query. A missing rank type or member yields
/// the default value: no entries and a total of zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankResult {
    pub ranks: Vec<RankItem>,
    pub top: Option<RankItem>,
    pub me: Option<RankItem>,
    #[serde(rename = "total_rank_num")]
    pub total: u32,
}

/// Returns the window of `count` entries starting at the 1-based `start_rank`,
/// together with the top entry and the requester's own entry.
pub fn rank_window(
    index: Option<&RankingIndex>,
    start_rank: u32,
    count: u32,
    me: &str,
    reverse: bool,
) -> RankResult {
    let Some(index) = index else {
        return RankResult::default();
    };
    let start = i64::from(start_rank) - 1;
    let end = start + i64::from(count) - 1;
    build(index, start, end, me, reverse)
}

/// Returns the entries around `me`: `offset` positions before it and
/// `offset - 1` after it.
pub fn rank_around_member(
    index: Option<&RankingIndex>,
    me: &str,
    offset: u32,
    reverse: bool,
) -> RankResult {
    let Some(index) = index else {
        return RankResult::default();
    };
    let Some(position) = index.rank(me, reverse) else {
        return RankResult::default();
    };
    let position = position as i64;
    let offset = i64::from(offset);
    let start = (position - offset).max(0);
    let end = position + offset - 1;
    build(index, start, end, me, reverse)
}

fn build(index: &RankingIndex, start: i64, end: i64, me: &str, reverse: bool) -> RankResult {
    let mut result = RankResult::default();

    index.range(start, end, reverse, |record, position| {
        result.ranks.push(RankItem::from_record(record, position));
        ControlFlow::Continue(())
    });

    index.range(0, 0, reverse, |record, position| {
        result.top = Some(RankItem::from_record(record, position));
        ControlFlow::Break(())
    });

    if let Some(record) = index.get(me)
        && let Some(position) = index.rank(me, reverse)
    {
        result.me = Some(RankItem::from_record(&record, position));
    }

    result.total = u32::try_from(index.len()).unwrap_or(u32::MAX);
    result
}
