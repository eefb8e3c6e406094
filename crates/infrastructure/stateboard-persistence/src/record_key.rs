use crate::StorageError;

pub const RECORD_KEY_SEPARATOR: u8 = 0;

/// Table key of a stored revision: `object_key \0 version_id`.
///
/// Object keys may not contain NUL, so the first separator always splits
/// the two halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKey<'a> {
    pub object_key: &'a str,
    pub version_id: &'a str,
}

impl<'a> RecordKey<'a> {
    pub fn new(object_key: &'a str, version_id: &'a str) -> Result<Self, StorageError> {
        Self::validate_object_key(object_key)?;
        Ok(Self {
            object_key,
            version_id,
        })
    }

    pub fn validate_object_key(object_key: &str) -> Result<(), StorageError> {
        if object_key.is_empty() || object_key.as_bytes().contains(&RECORD_KEY_SEPARATOR) {
            return Err(StorageError::InvalidKey(object_key.to_string()));
        }
        Ok(())
    }

    pub fn to_bytes(self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.object_key.len() + 1 + self.version_id.len());
        key.extend_from_slice(self.object_key.as_bytes());
        key.push(RECORD_KEY_SEPARATOR);
        key.extend_from_slice(self.version_id.as_bytes());
        key
    }

    pub fn from_bytes(bytes: &'a [u8]) -> Option<Self> {
        let sep = bytes.iter().position(|b| *b == RECORD_KEY_SEPARATOR)?;
        let object_key = std::str::from_utf8(&bytes[..sep]).ok()?;
        let version_id = std::str::from_utf8(&bytes[sep + 1..]).ok()?;
        Some(Self {
            object_key,
            version_id,
        })
    }
}
