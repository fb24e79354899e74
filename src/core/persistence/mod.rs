// src/core/persistence/mod.rs

//! The persistence side of the rank store: the gateway contract, its
//! implementations, the stored-value codec and the write-through pipeline.

pub mod codec;
pub mod gateway;
pub mod memory;
pub mod resp_gateway;
pub mod writer;

pub use gateway::PersistenceGateway;
pub use memory::MemoryGateway;
pub use resp_gateway::RespGateway;
pub use writer::{
    LoggingObserver, PersistOp, PersistOutcome, PersistQueue, PersistenceObserver,
    PersistenceWriter,
};
