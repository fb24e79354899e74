// src/core/rank/store.rs

//! The rank store owns every ranking index and the mirror of the rank type
//! registry. Mutations are applied to memory synchronously and written
//! through to the persistence gateway asynchronously via a [`PersistQueue`].

use super::index::RankingIndex;
use super::record::Record;
use super::registry::RankTypeRegistry;
use crate::core::RankError;
use crate::core::metrics;
use crate::core::persistence::codec::{
    decode_record, decode_registry, encode_record, encode_registry, rank_key, registry_key,
};
use crate::core::persistence::{
    LoggingObserver, PersistOp, PersistOutcome, PersistQueue, PersistenceGateway,
    PersistenceObserver,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RankStore {
    indexes: HashMap<i32, RankingIndex>,
    registry: RankTypeRegistry,
    registry_key: String,
    persist: PersistQueue,
    observer: Arc<dyn PersistenceObserver>,
}

impl RankStore {
    /// Creates an empty store with the default logging observer.
    pub fn new(server_id: &str, persist: PersistQueue) -> Self {
        Self {
            indexes: HashMap::new(),
            registry: RankTypeRegistry::new(),
            registry_key: registry_key(server_id),
            persist,
            observer: Arc::new(LoggingObserver),
        }
    }

    /// Replaces the observer notified of persistence outcomes.
    pub fn with_observer(mut self, observer: Arc<dyn PersistenceObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Loads the persisted state. Any read or decode failure aborts the load,
    /// since the service must not come up with partially loaded rankings.
    pub async fn load(
        gateway: &dyn PersistenceGateway,
        server_id: &str,
        persist: PersistQueue,
    ) -> Result<Self, RankError> {
        let mut store = Self::new(server_id, persist);

        let blob = gateway.get(&store.registry_key).await?;
        let Some(blob) = blob.filter(|b| !b.is_empty()) else {
            info!(
                "No rank type registry found at '{}'. Starting with no rankings.",
                store.registry_key
            );
            return Ok(store);
        };
        let registered = RankTypeRegistry::from_types(decode_registry(&blob)?);

        for &rank_type in registered.types() {
            let key = rank_key(rank_type);
            let fields = gateway.hash_get_all(&key).await?;
            if fields.is_empty() {
                // Deleted types stay in the persisted blob; keep them absent.
                warn!(
                    "Rank type {} is registered but hash '{}' is empty. Skipping it.",
                    rank_type, key
                );
                continue;
            }

            let records = fields
                .iter()
                .map(|(field, value)| decode_record(field, value))
                .collect::<Result<Vec<Record>, RankError>>()?;
            let index = RankingIndex::from_records(records);
            debug!("Loaded rank type {} with {} members.", rank_type, index.len());
            store.registry.register(rank_type);
            store.indexes.insert(rank_type, index);
        }

        info!(
            "Loaded {} rank types with {} members in total.",
            store.indexes.len(),
            store.total_members()
        );
        store.refresh_gauges();
        Ok(store)
    }

    pub fn index(&self, rank_type: i32) -> Option<&RankingIndex> {
        self.indexes.get(&rank_type)
    }

    pub fn registry(&self) -> &RankTypeRegistry {
        &self.registry
    }

    /// The rank types that currently have an index, in ascending order.
    pub fn rank_types(&self) -> Vec<i32> {
        let mut types: Vec<i32> = self.indexes.keys().copied().collect();
        types.sort_unstable();
        types
    }

    pub fn total_members(&self) -> usize {
        self.indexes.values().map(RankingIndex::len).sum()
    }

    /// Returns the index for `rank_type`, creating and registering it on first use.
    fn index_or_create(&mut self, rank_type: i32) -> &mut RankingIndex {
        if !self.indexes.contains_key(&rank_type) {
            info!("Creating rank type {}.", rank_type);
            if self.registry.register(rank_type) {
                self.persist_registry();
            }
        }
        self.indexes.entry(rank_type).or_default()
    }

    fn persist_registry(&self) {
        match encode_registry(self.registry.types()) {
            Ok(value) => self.submit(PersistOp::Set {
                key: self.registry_key.clone(),
                value,
            }),
            Err(e) => warn!("Failed to encode rank type registry: {}", e),
        }
    }

    /// Upserts a batch of `member -> (score, tiebreak)` entries.
    ///
    /// Memory is updated before this returns; the batch is persisted as one
    /// hash write that is queued, not awaited. Entries that fail to encode are
    /// still ranked in memory but left out of the write.
    pub fn update_scores(&mut self, rank_type: i32, batch: IndexMap<String, (u64, u64)>) {
        if batch.is_empty() {
            return;
        }
        let index = self.index_or_create(rank_type);

        let mut staged = IndexMap::with_capacity(batch.len());
        for (member, (score, tiebreak)) in batch {
            let record = Record::new(member, score, tiebreak);
            match encode_record(&record) {
                Ok(value) => {
                    staged.insert(record.member.clone(), value);
                }
                Err(e) => warn!(
                    "Skipping persistence of member '{}' in rank type {}: {}",
                    record.member, rank_type, e
                ),
            }
            index.upsert(record);
        }

        if !staged.is_empty() {
            self.submit(PersistOp::HashSetMany {
                key: rank_key(rank_type),
                fields: staged,
            });
        }
        self.refresh_gauges();
    }

    /// Removes members from a rank type. Unknown types and members are ignored.
    pub fn delete_members(&mut self, rank_type: i32, members: Vec<String>) {
        let Some(index) = self.indexes.get_mut(&rank_type) else {
            return;
        };
        for member in &members {
            index.remove(member);
        }
        if !members.is_empty() {
            self.submit(PersistOp::HashDelete {
                key: rank_key(rank_type),
                fields: members,
            });
        }
        self.refresh_gauges();
    }

    /// Drops a rank type from memory and deletes its persisted hash.
    /// The persisted registry blob is left as it is.
    pub fn delete_rank_type(&mut self, rank_type: i32) -> Result<(), RankError> {
        if self.indexes.remove(&rank_type).is_none() {
            return Err(RankError::RankTypeNotFound(rank_type));
        }
        self.registry.unregister(rank_type);
        info!("Deleted rank type {}.", rank_type);
        self.submit(PersistOp::Delete {
            key: rank_key(rank_type),
        });
        self.refresh_gauges();
        Ok(())
    }

    /// Handles a completed persistence op delivered back to the worker.
    pub fn on_persisted(&self, outcome: PersistOutcome) {
        match &outcome.result {
            Ok(()) => self.observer.on_success(&outcome.op),
            Err(e) => self.observer.on_failure(&outcome.op, e),
        }
    }

    fn submit(&self, op: PersistOp) {
        if let Err((op, e)) = self.persist.submit(op) {
            self.observer.on_failure(&op, &e);
        }
    }

    fn refresh_gauges(&self) {
        metrics::RANK_TYPES.set(self.indexes.len() as f64);
        metrics::RANKED_MEMBERS.set(self.total_members() as f64);
    }
}
