//! Read path used by the HTTP layer and the CLI.

use std::sync::Arc;

use stateboard_core::delta::for_key;
use stateboard_core::{version_label, ObjectKey, VersionDescriptor, VersionRecord};

use crate::sync::{blocking_store, SyncEngine, SyncError};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("failed to list states: {0}")]
    ListKeys(#[source] SyncError),
    #[error("failed to list history of {key}: {source}")]
    History {
        key: ObjectKey,
        #[source]
        source: SyncError,
    },
    #[error("failed to read {key}@{version_id}: {reason}")]
    StoreRead {
        key: ObjectKey,
        version_id: String,
        reason: String,
    },
}

impl QueryError {
    /// Short message suitable for an API error body.
    pub fn summary(&self) -> String {
        match self {
            QueryError::ListKeys(_) => "Failed to list states".to_string(),
            QueryError::History { key, .. } => format!("State file history not found: {key}"),
            QueryError::StoreRead { key, version_id, .. } => {
                format!("Failed to read state {key} at version {}", version_label(version_id))
            }
        }
    }

    /// Underlying cause, for the `details` field of an API error body.
    pub fn details(&self) -> String {
        match self {
            QueryError::ListKeys(e) | QueryError::History { source: e, .. } => e.to_string(),
            QueryError::StoreRead { reason, .. } => reason.clone(),
        }
    }
}

/// Cheap-to-clone handle over a [`SyncEngine`] for readers.
#[derive(Clone)]
pub struct QueryFacade {
    engine: Arc<SyncEngine>,
}

impl QueryFacade {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Fresh listing of tracked keys; also refreshes the snapshot.
    pub async fn list_current_keys(&self) -> Result<Vec<ObjectKey>, QueryError> {
        let keys = self
            .engine
            .refresh_keys()
            .await
            .map_err(QueryError::ListKeys)?;
        Ok(keys.to_vec())
    }

    /// Keys from the last successful listing, without touching the remote.
    pub fn cached_keys(&self) -> Vec<ObjectKey> {
        self.engine.snapshot().load().to_vec()
    }

    /// Locally stored record of `key` at `version_id`; `Ok(None)` when absent.
    pub async fn get_version(
        &self,
        key: &str,
        version_id: &str,
    ) -> Result<Option<VersionRecord>, QueryError> {
        let (k, v) = (key.to_string(), version_id.to_string());
        blocking_store(self.engine.store(), move |s| s.get(&k, &v))
            .await
            .map_err(|reason| QueryError::StoreRead {
                key: key.to_string(),
                version_id: version_id.to_string(),
                reason,
            })
    }

    /// Remote version listing of `key`, straight from the object store.
    pub async fn list_history(&self, key: &str) -> Result<Vec<VersionDescriptor>, QueryError> {
        let listing = self
            .engine
            .source()
            .list_versions(key)
            .await
            .map_err(|source| QueryError::History {
                key: key.to_string(),
                source,
            })?;
        Ok(for_key(key, listing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_split_summary_from_details() {
        let err = QueryError::History {
            key: "env/a.tfstate".into(),
            source: SyncError::RemoteList("HTTP 403".into()),
        };
        assert_eq!(err.summary(), "State file history not found: env/a.tfstate");
        assert!(err.details().contains("HTTP 403"));

        let err = QueryError::StoreRead {
            key: "a.tfstate".into(),
            version_id: String::new(),
            reason: "disk gone".into(),
        };
        assert_eq!(err.summary(), "Failed to read state a.tfstate at version current");
        assert_eq!(err.details(), "disk gone");
    }
}
