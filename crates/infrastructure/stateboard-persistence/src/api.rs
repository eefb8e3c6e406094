use stateboard_core::{VersionId, VersionRecord};

pub const STATEBOARD_REDB_FILENAME: &str = "stateboard.redb";
pub const CURRENT_SCHEMA: u32 = 1;

/// What an insert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No record existed for the (key, version) pair.
    Inserted,
    /// The current-version record was overwritten with fresh content.
    Replaced,
    /// A historical record already existed and was left untouched.
    AlreadyPresent,
}

/// Durable storage for fetched object revisions.
///
/// Historical records are write-once. The current-version record (empty
/// version id) is an upsert. Implementations must be safe to call from
/// several threads at once.
pub trait VersionStore: Send + Sync {
    fn insert(
        &self,
        key: &str,
        version_id: &str,
        content: &[u8],
    ) -> Result<InsertOutcome, crate::StorageError>;

    fn get(
        &self,
        key: &str,
        version_id: &str,
    ) -> Result<Option<VersionRecord>, crate::StorageError>;

    /// Every stored historical version id. The current-version sentinel is
    /// never part of this listing.
    fn list_known_version_ids(&self) -> Result<Vec<VersionId>, crate::StorageError>;
}
