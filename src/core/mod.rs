// src/core/mod.rs

//! The central module containing the ranking engine and the services around it.

pub mod errors;
pub mod metrics;
pub mod persistence;
pub mod protocol;
pub mod rank;
pub mod service;
pub mod worker;

pub use errors::RankError;
pub use rank::{RankResult, RankStore, RankingIndex, Record};
pub use service::RankService;
pub use worker::{RankHandle, RankWorker};
