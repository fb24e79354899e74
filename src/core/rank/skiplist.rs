// src/core/rank/skiplist.rs

//! An indexable skip list of [`Record`]s.
//!
//! Every forward link carries a `span`: the number of level-0 steps it skips.
//! Summing spans along a search path yields a node's position, which gives
//! O(log n) rank lookups and O(log n) access by position. Nodes live in an
//! arena addressed by `usize` handles, with freed slots recycled.

use super::record::{Record, RecordKey};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Upper bound on the number of levels; enough for 4^32 elements.
const MAX_LEVEL: usize = 32;
/// Probability that a node is promoted to the next level.
const LEVEL_PROBABILITY: f64 = 0.25;

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    forward: Option<usize>,
    span: usize,
}

#[derive(Debug, Clone)]
struct Node {
    record: Record,
    backward: Option<usize>,
    levels: Vec<Link>,
}

#[derive(Debug, Clone)]
pub struct SkipList {
    /// Links of the sentinel head node, one per possible level.
    head: [Link; MAX_LEVEL],
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    tail: Option<usize>,
    level: usize,
    length: usize,
    rng: SmallRng,
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipList {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Creates a list whose level generator is seeded, for reproducible layouts.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            head: [Link::default(); MAX_LEVEL],
            nodes: Vec::new(),
            free: Vec::new(),
            tail: None,
            level: 1,
            length: 0,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn node(&self, id: usize) -> &Node {
        match &self.nodes[id] {
            Some(node) => node,
            None => unreachable!("skip list handle {id} points at a freed slot"),
        }
    }

    fn node_mut(&mut self, id: usize) -> &mut Node {
        match &mut self.nodes[id] {
            Some(node) => node,
            None => unreachable!("skip list handle {id} points at a freed slot"),
        }
    }

    /// The link at level `i` of `at`, where `None` denotes the head sentinel.
    fn link(&self, at: Option<usize>, i: usize) -> Link {
        match at {
            None => self.head[i],
            Some(id) => self.node(id).levels[i],
        }
    }

    fn link_mut(&mut self, at: Option<usize>, i: usize) -> &mut Link {
        match at {
            None => &mut self.head[i],
            Some(id) => &mut self.node_mut(id).levels[i],
        }
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen_bool(LEVEL_PROBABILITY) {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    /// Inserts a record. The caller guarantees no equal record is present.
    pub fn insert(&mut self, record: Record) {
        let mut update: [Option<usize>; MAX_LEVEL] = [None; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];
        let mut x: Option<usize> = None;

        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            loop {
                let link = self.link(x, i);
                match link.forward {
                    Some(next) if self.node(next).record.key() < record.key() => {
                        rank[i] += link.span;
                        x = Some(next);
                    }
                    _ => break,
                }
            }
            update[i] = x;
        }

        let level = self.random_level();
        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                update[i] = None;
                self.head[i].span = self.length;
            }
            self.level = level;
        }

        let id = self.alloc(Node {
            record,
            backward: update[0],
            levels: vec![Link::default(); level],
        });

        for i in 0..level {
            let prev = self.link(update[i], i);
            let walked = rank[0] - rank[i];
            self.node_mut(id).levels[i] = Link {
                forward: prev.forward,
                span: prev.span - walked,
            };
            *self.link_mut(update[i], i) = Link {
                forward: Some(id),
                span: walked + 1,
            };
        }
        for i in level..self.level {
            self.link_mut(update[i], i).span += 1;
        }

        match self.node(id).levels[0].forward {
            Some(next) => self.node_mut(next).backward = Some(id),
            None => self.tail = Some(id),
        }
        self.length += 1;
    }

    /// Removes the record matching `key` exactly. Returns it if it was present.
    pub fn remove(&mut self, key: RecordKey<'_>) -> Option<Record> {
        let mut update: [Option<usize>; MAX_LEVEL] = [None; MAX_LEVEL];
        let mut x: Option<usize> = None;

        for i in (0..self.level).rev() {
            loop {
                match self.link(x, i).forward {
                    Some(next) if self.node(next).record.key() < key => x = Some(next),
                    _ => break,
                }
            }
            update[i] = x;
        }

        let target = self.link(update[0], 0).forward?;
        if self.node(target).record.key() != key {
            return None;
        }
        Some(self.unlink(target, &update))
    }

    fn unlink(&mut self, id: usize, update: &[Option<usize>; MAX_LEVEL]) -> Record {
        for i in 0..self.level {
            let prev = self.link(update[i], i);
            if prev.forward == Some(id) {
                let removed = self.node(id).levels[i];
                *self.link_mut(update[i], i) = Link {
                    forward: removed.forward,
                    span: prev.span + removed.span - 1,
                };
            } else {
                self.link_mut(update[i], i).span -= 1;
            }
        }

        let (forward, backward) = {
            let node = self.node(id);
            (node.levels[0].forward, node.backward)
        };
        match forward {
            Some(next) => self.node_mut(next).backward = backward,
            None => self.tail = backward,
        }

        while self.level > 1 && self.head[self.level - 1].forward.is_none() {
            self.level -= 1;
        }
        self.length -= 1;

        let node = self.nodes[id].take();
        self.free.push(id);
        match node {
            Some(node) => node.record,
            None => unreachable!("skip list handle {id} points at a freed slot"),
        }
    }

    /// Returns the 0-based ascending position of the record matching `key`.
    pub fn position_of(&self, key: RecordKey<'_>) -> Option<usize> {
        let mut traversed = 0usize;
        let mut x: Option<usize> = None;

        for i in (0..self.level).rev() {
            loop {
                let link = self.link(x, i);
                match link.forward {
                    Some(next) if self.node(next).record.key() <= key => {
                        traversed += link.span;
                        x = Some(next);
                    }
                    _ => break,
                }
            }
            if let Some(id) = x
                && self.node(id).record.key() == key
            {
                return Some(traversed - 1);
            }
        }
        None
    }

    /// Finds the node at the given 0-based ascending position.
    fn node_at(&self, position: usize) -> Option<usize> {
        if position >= self.length {
            return None;
        }
        let target = position + 1;
        let mut traversed = 0usize;
        let mut x: Option<usize> = None;

        for i in (0..self.level).rev() {
            loop {
                let link = self.link(x, i);
                match link.forward {
                    Some(next) if traversed + link.span <= target => {
                        traversed += link.span;
                        x = Some(next);
                    }
                    _ => break,
                }
            }
            if traversed == target {
                return x;
            }
        }
        None
    }

    pub fn get_by_position(&self, position: usize) -> Option<&Record> {
        self.node_at(position).map(|id| &self.node(id).record)
    }

    pub fn first(&self) -> Option<&Record> {
        self.head[0].forward.map(|id| &self.node(id).record)
    }

    pub fn last(&self) -> Option<&Record> {
        self.tail.map(|id| &self.node(id).record)
    }

    /// Iterates ascending from `position`.
    pub fn iter_from(&self, position: usize) -> Iter<'_> {
        Iter {
            list: self,
            next: self.node_at(position),
            reverse: false,
        }
    }

    /// Iterates descending from the ascending `position`.
    pub fn iter_back_from(&self, position: usize) -> Iter<'_> {
        Iter {
            list: self,
            next: self.node_at(position),
            reverse: true,
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            next: self.head[0].forward,
            reverse: false,
        }
    }
}

/// Walks level 0 of a [`SkipList`] in either direction.
pub struct Iter<'a> {
    list: &'a SkipList,
    next: Option<usize>,
    reverse: bool,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.list.node(id);
        self.next = if self.reverse {
            node.backward
        } else {
            node.levels[0].forward
        };
        Some(&node.record)
    }
}
