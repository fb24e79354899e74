// src/core/rank/index.rs

use super::record::{Record, RecordKey};
use super::skiplist::{Iter, SkipList};
use std::collections::HashMap;
use std::ops::ControlFlow;

/// The ordered, indexable collection of records for one rank type.
/// It uses a `HashMap` for O(1) lookups of a member's current keys and a
/// span-augmented skip list that keeps entries in total order for O(log n)
/// rank and window queries.
#[derive(Debug, Clone, Default)]
pub struct RankingIndex {
    /// Member to `(score, tiebreak)`.
    members: HashMap<String, (u64, u64)>,
    /// Entries sorted by score, then tiebreak, then member.
    sorted: SkipList,
}

impl RankingIndex {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates an index whose skip list levels are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            members: HashMap::new(),
            sorted: SkipList::with_seed(seed),
        }
    }

    /// Bulk-builds an index from decoded records. Later duplicates of a member win.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.upsert(record);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ascending iteration over all records.
    pub fn iter(&self) -> Iter<'_> {
        self.sorted.iter()
    }

    /// Inserts or wholesale replaces the record for `record.member`.
    /// Returns `true` if the member was new or its keys changed.
    pub fn upsert(&mut self, record: Record) -> bool {
        if let Some(&(score, tiebreak)) = self.members.get(&record.member) {
            if score == record.score && tiebreak == record.tiebreak {
                return false;
            }
            self.sorted.remove(RecordKey {
                score,
                tiebreak,
                member: &record.member,
            });
        }
        self.members
            .insert(record.member.clone(), (record.score, record.tiebreak));
        self.sorted.insert(record);
        true
    }

    /// Removes a member. Returns `true` if the member was present.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.members.remove_entry(member) {
            Some((member, (score, tiebreak))) => {
                self.sorted.remove(RecordKey {
                    score,
                    tiebreak,
                    member: &member,
                });
                true
            }
            None => false,
        }
    }

    pub fn get(&self, member: &str) -> Option<Record> {
        self.members
            .get(member)
            .map(|&(score, tiebreak)| Record::new(member, score, tiebreak))
    }

    /// Returns the 0-based position of a member, ascending unless `reverse`.
    pub fn rank(&self, member: &str, reverse: bool) -> Option<usize> {
        let (stored, &(score, tiebreak)) = self.members.get_key_value(member)?;
        let ascending = self.sorted.position_of(RecordKey {
            score,
            tiebreak,
            member: stored,
        })?;
        if reverse {
            Some(self.len() - 1 - ascending)
        } else {
            Some(ascending)
        }
    }

    /// Visits the records whose position in the requested direction falls in
    /// the inclusive window `[start, end]`, clamped to `[0, len-1]`.
    /// The visitor receives each record with its position and may stop early.
    pub fn range<F>(&self, start: i64, end: i64, reverse: bool, mut visitor: F)
    where
        F: FnMut(&Record, usize) -> ControlFlow<()>,
    {
        let len = self.len() as i64;
        let start = start.max(0);
        let end = end.min(len - 1);
        if start > end || start >= len {
            return;
        }
        let (start, end) = (start as usize, end as usize);
        let last = self.len() - 1;

        let walk = if reverse {
            self.sorted.iter_back_from(last - start)
        } else {
            self.sorted.iter_from(start)
        };
        for (position, record) in (start..=end).zip(walk) {
            if visitor(record, position).is_break() {
                return;
            }
        }
    }

    /// Collects a window into a vector of `(record, position)` pairs.
    pub fn get_range(&self, start: i64, end: i64, reverse: bool) -> Vec<(Record, usize)> {
        let mut out = Vec::new();
        self.range(start, end, reverse, |record, position| {
            out.push((record.clone(), position));
            ControlFlow::Continue(())
        });
        out
    }
}
