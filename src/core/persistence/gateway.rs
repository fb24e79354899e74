// src/core/persistence/gateway.rs

use crate::core::RankError;
use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;

/// The minimal capability contract the rank store needs from its
/// key/hash-oriented persistence medium.
///
/// Reading a key that does not exist is not an error: `get` yields `None`
/// and `hash_get_all` yields an empty map.
#[async_trait]
pub trait PersistenceGateway: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, RankError>;

    async fn set(&self, key: &str, value: Bytes) -> Result<(), RankError>;

    async fn hash_get_all(&self, key: &str) -> Result<IndexMap<String, Bytes>, RankError>;

    async fn hash_set_many(
        &self,
        key: &str,
        fields: &IndexMap<String, Bytes>,
    ) -> Result<(), RankError>;

    async fn hash_delete(&self, key: &str, fields: &[String]) -> Result<(), RankError>;

    async fn delete(&self, key: &str) -> Result<(), RankError>;
}
