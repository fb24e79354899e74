// src/core/rank/registry.rs

/// The ordered, duplicate-free set of rank types that have been mutated.
/// It mirrors the persisted registry blob consulted at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankTypeRegistry {
    types: Vec<i32>,
}

impl RankTypeRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds a registry from a decoded blob, dropping repeated entries.
    pub fn from_types(types: impl IntoIterator<Item = i32>) -> Self {
        let mut registry = Self::new();
        for rank_type in types {
            registry.register(rank_type);
        }
        registry
    }

    /// Appends a rank type. Returns `false` if it was already known.
    pub fn register(&mut self, rank_type: i32) -> bool {
        if self.contains(rank_type) {
            return false;
        }
        self.types.push(rank_type);
        true
    }

    pub fn unregister(&mut self, rank_type: i32) -> bool {
        let before = self.types.len();
        self.types.retain(|t| *t != rank_type);
        self.types.len() != before
    }

    pub fn contains(&self, rank_type: i32) -> bool {
        self.types.contains(&rank_type)
    }

    pub fn types(&self) -> &[i32] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
