// src/core/rank/mod.rs

//! The in-memory ranking engine: records and their total order, the
//! indexable skip list, per-rank-type indexes, the store that owns them and
//! the query builders that read them.

pub mod index;
pub mod query;
pub mod record;
pub mod registry;
pub mod skiplist;
pub mod store;

pub use index::RankingIndex;
pub use query::RankResult;
pub use record::{RankItem, Record, RecordKey};
pub use registry::RankTypeRegistry;
pub use store::RankStore;
