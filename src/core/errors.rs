// src/core/errors.rs

//! Defines the primary error type for the ranking core and its persistence layer.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all failures inside the ranking core.
/// Lookup misses are not errors; they are modelled as empty results.
#[derive(Error, Debug)]
pub enum RankError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Incomplete data in stream")]
    IncompleteData,

    #[error("Syntax error")]
    SyntaxError,

    /// The store answered with a RESP error or an unexpected reply shape.
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Connection to the persistence store was closed")]
    ConnectionClosed,

    #[error("Failed to decode persisted data: {0}")]
    Decode(String),

    #[error("Failed to encode record: {0}")]
    Encode(String),

    #[error("Rank type {0} not found")]
    RankTypeNotFound(i32),

    #[error("Persistence queue is full")]
    QueueFull,

    #[error("Rank worker is not running")]
    WorkerUnavailable,

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

// `std::io::Error` is not cloneable, so it is shared behind an Arc.
impl Clone for RankError {
    fn clone(&self) -> Self {
        match self {
            RankError::Io(e) => RankError::Io(Arc::clone(e)),
            RankError::IncompleteData => RankError::IncompleteData,
            RankError::SyntaxError => RankError::SyntaxError,
            RankError::Gateway(s) => RankError::Gateway(s.clone()),
            RankError::ConnectionClosed => RankError::ConnectionClosed,
            RankError::Decode(s) => RankError::Decode(s.clone()),
            RankError::Encode(s) => RankError::Encode(s.clone()),
            RankError::RankTypeNotFound(t) => RankError::RankTypeNotFound(*t),
            RankError::QueueFull => RankError::QueueFull,
            RankError::WorkerUnavailable => RankError::WorkerUnavailable,
            RankError::Internal(s) => RankError::Internal(s.clone()),
        }
    }
}

impl PartialEq for RankError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RankError::Io(e1), RankError::Io(e2)) => e1.to_string() == e2.to_string(),
            (RankError::Gateway(s1), RankError::Gateway(s2)) => s1 == s2,
            (RankError::Decode(s1), RankError::Decode(s2)) => s1 == s2,
            (RankError::Encode(s1), RankError::Encode(s2)) => s1 == s2,
            (RankError::RankTypeNotFound(t1), RankError::RankTypeNotFound(t2)) => t1 == t2,
            (RankError::Internal(s1), RankError::Internal(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for RankError {
    fn from(e: std::io::Error) -> Self {
        RankError::Io(Arc::new(e))
    }
}

impl From<std::string::FromUtf8Error> for RankError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        RankError::Decode(format!("invalid utf-8: {e}"))
    }
}

impl From<serde_json::Error> for RankError {
    fn from(e: serde_json::Error) -> Self {
        RankError::Decode(format!("JSON serialization/deserialization error: {e}"))
    }
}

impl From<bincode::error::DecodeError> for RankError {
    fn from(e: bincode::error::DecodeError) -> Self {
        RankError::Decode(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for RankError {
    fn from(e: bincode::error::EncodeError) -> Self {
        RankError::Encode(e.to_string())
    }
}
