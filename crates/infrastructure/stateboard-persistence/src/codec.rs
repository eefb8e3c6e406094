use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::StorageError;

/// Metadata stored next to a record's raw content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordHeader {
    pub fetched_at: DateTime<Utc>,
    pub size: u64,
}

pub fn encode_header(header: &RecordHeader) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(header)?)
}

pub fn decode_header(bytes: &[u8]) -> Result<RecordHeader, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}
