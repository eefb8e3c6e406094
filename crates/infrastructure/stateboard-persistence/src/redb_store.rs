use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use stateboard_core::{is_current_version, VersionId, VersionRecord};

use crate::api::{InsertOutcome, CURRENT_SCHEMA, STATEBOARD_REDB_FILENAME};
use crate::codec::{decode_header, encode_header, RecordHeader};
use crate::maintenance::quarantine_corrupt_file;
use crate::record_key::RecordKey;
use crate::{StorageError, VersionStore};

const META: TableDefinition<&str, &str> = TableDefinition::new("meta");
const VERSIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("versions");
const CONTENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("contents");

const META_FORMAT_KEY: &str = "format";
const META_FORMAT_VALUE: &str = "stateboard-redb";
const META_SCHEMA_VERSION: &str = "schema_version";
const META_CREATED_AT: &str = "created_at";
const META_LAST_SYNC_AT: &str = "last_sync_at";

/// [`VersionStore`] backed by a single redb file.
///
/// Cloning is cheap; clones share the open database.
#[derive(Clone)]
pub struct RedbVersionStore {
    path: Utf8PathBuf,
    db: Arc<Database>,
}

impl fmt::Debug for RedbVersionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbVersionStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbVersionStore {
    fn is_corrupt_open_error(err: &redb::DatabaseError) -> bool {
        match err {
            redb::DatabaseError::Storage(storage) => match storage {
                redb::StorageError::Corrupted(_) => true,
                redb::StorageError::Io(ioe) => matches!(
                    ioe.kind(),
                    std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof
                ),
                _ => false,
            },
            _ => false,
        }
    }

    pub fn path_for_root(root: &Utf8Path) -> Utf8PathBuf {
        root.join(STATEBOARD_REDB_FILENAME)
    }

    /// Open `stateboard.redb` under `root`, creating it when missing.
    ///
    /// A corrupt file is moved aside and replaced by an empty database: the
    /// store only caches what the remote already holds, so the next cycle
    /// refills it. A file written by a newer schema is left alone.
    pub fn open(root: &Utf8Path) -> Result<Self, StorageError> {
        let path = Self::path_for_root(root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Self::open_existing_or_create(&path) {
            Err(StorageError::Corrupt) => {
                quarantine_corrupt_file(&path)?;
                Self::open_existing_or_create(&path)?
            }
            other => other?,
        };

        Ok(Self {
            path,
            db: Arc::new(db),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn open_existing_or_create(path: &Utf8Path) -> Result<Database, StorageError> {
        let db = if path.exists() {
            match Database::open(path.as_std_path()) {
                Ok(db) => db,
                Err(e) if Self::is_corrupt_open_error(&e) => return Err(StorageError::Corrupt),
                Err(e) => return Err(e.into()),
            }
        } else {
            Database::create(path.as_std_path())?
        };

        Self::ensure_schema(&db)?;
        Ok(db)
    }

    fn ensure_schema(db: &Database) -> Result<(), StorageError> {
        // Create tables and required meta keys on first open.
        let write_tx = db.begin_write()?;
        {
            let mut meta = write_tx.open_table(META)?;
            let format: Option<String> = meta.get(META_FORMAT_KEY)?.map(|g| g.value().to_string());
            if format.is_none() {
                let schema_version = CURRENT_SCHEMA.to_string();
                let created_at = Utc::now().to_rfc3339();
                meta.insert(META_FORMAT_KEY, META_FORMAT_VALUE)?;
                meta.insert(META_SCHEMA_VERSION, schema_version.as_str())?;
                meta.insert(META_CREATED_AT, created_at.as_str())?;
            } else if format.as_deref() != Some(META_FORMAT_VALUE) {
                return Err(StorageError::Corrupt);
            }
        }
        let _ = write_tx.open_table(VERSIONS)?;
        let _ = write_tx.open_table(CONTENTS)?;
        write_tx.commit()?;

        let read_tx = db.begin_read()?;
        let meta = read_tx.open_table(META)?;
        let schema_version = meta
            .get(META_SCHEMA_VERSION)?
            .and_then(|g| g.value().parse::<u32>().ok())
            .unwrap_or(0);
        if schema_version == 0 {
            return Err(StorageError::Corrupt);
        }
        if schema_version > CURRENT_SCHEMA {
            return Err(StorageError::NewerSchema {
                found: schema_version,
                supported: CURRENT_SCHEMA,
            });
        }
        if schema_version != CURRENT_SCHEMA {
            return Err(StorageError::Corrupt);
        }
        Ok(())
    }

    /// Timestamp of the last insert that changed the store, if any.
    pub fn last_sync_at(&self) -> Result<Option<String>, StorageError> {
        let read_tx = self.db.begin_read()?;
        let meta = read_tx.open_table(META)?;
        let value = meta.get(META_LAST_SYNC_AT)?.map(|g| g.value().to_string());
        Ok(value)
    }
}

impl VersionStore for RedbVersionStore {
    fn insert(
        &self,
        key: &str,
        version_id: &str,
        content: &[u8],
    ) -> Result<InsertOutcome, StorageError> {
        let record_key = RecordKey::new(key, version_id)?.to_bytes();
        let header = encode_header(&RecordHeader {
            fetched_at: Utc::now(),
            size: content.len() as u64,
        })?;

        let write_tx = self.db.begin_write()?;
        let outcome = {
            let mut versions = write_tx.open_table(VERSIONS)?;
            let exists = versions.get(record_key.as_slice())?.is_some();

            if exists && !is_current_version(version_id) {
                InsertOutcome::AlreadyPresent
            } else {
                let mut contents = write_tx.open_table(CONTENTS)?;
                versions.insert(record_key.as_slice(), header.as_slice())?;
                contents.insert(record_key.as_slice(), content)?;

                let ts = Utc::now().to_rfc3339();
                let mut meta = write_tx.open_table(META)?;
                meta.insert(META_LAST_SYNC_AT, ts.as_str())?;

                if exists {
                    InsertOutcome::Replaced
                } else {
                    InsertOutcome::Inserted
                }
            }
        };

        if outcome == InsertOutcome::AlreadyPresent {
            write_tx.abort()?;
        } else {
            write_tx.commit()?;
        }
        Ok(outcome)
    }

    fn get(&self, key: &str, version_id: &str) -> Result<Option<VersionRecord>, StorageError> {
        let record_key = RecordKey::new(key, version_id)?.to_bytes();

        let read_tx = self.db.begin_read()?;
        let versions = read_tx.open_table(VERSIONS)?;
        let Some(header) = versions.get(record_key.as_slice())? else {
            return Ok(None);
        };
        let header = decode_header(header.value())?;

        let contents = read_tx.open_table(CONTENTS)?;
        let content = contents
            .get(record_key.as_slice())?
            .map(|g| g.value().to_vec())
            .ok_or_else(|| StorageError::MissingContent {
                key: key.to_string(),
                version_id: version_id.to_string(),
            })?;

        Ok(Some(VersionRecord {
            key: key.to_string(),
            version_id: version_id.to_string(),
            content,
            fetched_at: header.fetched_at,
        }))
    }

    fn list_known_version_ids(&self) -> Result<Vec<VersionId>, StorageError> {
        let read_tx = self.db.begin_read()?;
        let versions = read_tx.open_table(VERSIONS)?;

        let mut out = Vec::new();
        for row in versions.iter()? {
            let (k, _) = row?;
            let Some(parsed) = RecordKey::from_bytes(k.value()) else {
                tracing::warn!("skipping undecodable record key in version store");
                continue;
            };
            if is_current_version(parsed.version_id) {
                continue;
            }
            out.push(parsed.version_id.to_string());
        }
        Ok(out)
    }
}
