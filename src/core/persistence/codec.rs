// src/core/persistence/codec.rs

//! Encoding of the values the rank store keeps in the persistence gateway:
//! stored records (bincode, one per hash field) and the rank type registry
//! (a JSON array of integers).

use crate::core::RankError;
use crate::core::rank::Record;
use bincode::config;
use bytes::Bytes;

/// Builds the key of the registry blob for a server instance.
pub fn registry_key(server_id: &str) -> String {
    format!("{server_id}_rankType")
}

/// Builds the key of the hash holding all records of a rank type.
pub fn rank_key(rank_type: i32) -> String {
    format!("rank_{rank_type}")
}

pub fn encode_record(record: &Record) -> Result<Bytes, RankError> {
    let buf = bincode::encode_to_vec(record, config::standard())?;
    Ok(Bytes::from(buf))
}

/// Decodes a stored record and checks it belongs to the hash field it was read from.
pub fn decode_record(field: &str, value: &[u8]) -> Result<Record, RankError> {
    let (record, read): (Record, usize) = bincode::decode_from_slice(value, config::standard())?;
    if read != value.len() {
        return Err(RankError::Decode(format!(
            "trailing bytes after record for member '{field}'"
        )));
    }
    if record.member != field {
        return Err(RankError::Decode(format!(
            "record member '{}' does not match hash field '{field}'",
            record.member
        )));
    }
    Ok(record)
}

pub fn encode_registry(types: &[i32]) -> Result<Bytes, RankError> {
    let buf = serde_json::to_vec(types)?;
    Ok(Bytes::from(buf))
}

pub fn decode_registry(blob: &[u8]) -> Result<Vec<i32>, RankError> {
    Ok(serde_json::from_slice(blob)?)
}
