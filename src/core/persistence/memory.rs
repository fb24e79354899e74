// src/core/persistence/memory.rs

//! An in-process persistence gateway. It backs `backend = "memory"` and the
//! test suite, and can be told to fail reads or writes to exercise error paths.

use super::gateway::PersistenceGateway;
use crate::core::RankError;
use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Blob(Bytes),
    Hash(IndexMap<String, Bytes>),
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    data: Mutex<HashMap<String, StoredValue>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes every subsequent read fail until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The number of write operations that were applied successfully.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Returns a copy of a stored hash, or `None` if the key is absent or not a hash.
    pub fn hash_snapshot(&self, key: &str) -> Option<IndexMap<String, Bytes>> {
        match self.data.lock().get(key) {
            Some(StoredValue::Hash(fields)) => Some(fields.clone()),
            _ => None,
        }
    }

    pub fn blob_snapshot(&self, key: &str) -> Option<Bytes> {
        match self.data.lock().get(key) {
            Some(StoredValue::Blob(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn check_read(&self) -> Result<(), RankError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RankError::Gateway("injected read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), RankError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RankError::Gateway("injected write failure".to_string()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, RankError> {
        self.check_read()?;
        match self.data.lock().get(key) {
            None => Ok(None),
            Some(StoredValue::Blob(value)) => Ok(Some(value.clone())),
            Some(StoredValue::Hash(_)) => Err(RankError::Gateway(WRONGTYPE.to_string())),
        }
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), RankError> {
        self.check_write()?;
        self.data
            .lock()
            .insert(key.to_string(), StoredValue::Blob(value));
        self.record_write();
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<IndexMap<String, Bytes>, RankError> {
        self.check_read()?;
        match self.data.lock().get(key) {
            None => Ok(IndexMap::new()),
            Some(StoredValue::Hash(fields)) => Ok(fields.clone()),
            Some(StoredValue::Blob(_)) => Err(RankError::Gateway(WRONGTYPE.to_string())),
        }
    }

    async fn hash_set_many(
        &self,
        key: &str,
        fields: &IndexMap<String, Bytes>,
    ) -> Result<(), RankError> {
        self.check_write()?;
        if fields.is_empty() {
            return Ok(());
        }
        let mut data = self.data.lock();
        let entry = data
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::Hash(IndexMap::new()));
        match entry {
            StoredValue::Hash(existing) => {
                for (field, value) in fields {
                    existing.insert(field.clone(), value.clone());
                }
            }
            StoredValue::Blob(_) => return Err(RankError::Gateway(WRONGTYPE.to_string())),
        }
        drop(data);
        self.record_write();
        Ok(())
    }

    async fn hash_delete(&self, key: &str, fields: &[String]) -> Result<(), RankError> {
        self.check_write()?;
        let mut data = self.data.lock();
        let now_empty = match data.get_mut(key) {
            None => false,
            Some(StoredValue::Hash(existing)) => {
                for field in fields {
                    existing.shift_remove(field);
                }
                existing.is_empty()
            }
            Some(StoredValue::Blob(_)) => return Err(RankError::Gateway(WRONGTYPE.to_string())),
        };
        // A hash with no fields left ceases to exist, as in Redis.
        if now_empty {
            data.remove(key);
        }
        drop(data);
        self.record_write();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RankError> {
        self.check_write()?;
        self.data.lock().remove(key);
        self.record_write();
        Ok(())
    }
}
