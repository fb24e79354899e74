// src/core/rank/record.rs

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single leaderboard entry: a member, its score and the tie-break value
/// used to order members with equal scores (typically time of achievement).
///
/// Records are ordered by score, then tiebreak, then member. No two distinct
/// members ever compare equal, so every member has a stable position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Record {
    pub member: String,
    pub score: u64,
    pub tiebreak: u64,
}

impl Record {
    pub fn new(member: impl Into<String>, score: u64, tiebreak: u64) -> Self {
        Self {
            member: member.into(),
            score,
            tiebreak,
        }
    }

    /// Returns the borrowed ordering key of this record.
    pub fn key(&self) -> RecordKey<'_> {
        RecordKey {
            score: self.score,
            tiebreak: self.tiebreak,
            member: &self.member,
        }
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The borrowed form of a record's position in the total order.
///
/// Field order matters: the derived `Ord` compares score, then tiebreak, then member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordKey<'a> {
    pub score: u64,
    pub tiebreak: u64,
    pub member: &'a str,
}

/// A record paired with its 0-based position in the requested direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankItem {
    #[serde(rename = "id")]
    pub member: String,
    pub score: u64,
    #[serde(rename = "then")]
    pub tiebreak: u64,
    #[serde(rename = "rank")]
    pub position: u32,
}

impl RankItem {
    pub fn from_record(record: &Record, position: usize) -> Self {
        Self {
            member: record.member.clone(),
            score: record.score,
            tiebreak: record.tiebreak,
            position: u32::try_from(position).unwrap_or(u32::MAX),
        }
    }
}
