use std::sync::Arc;

use stateboard_infra::{S3Client, S3Config};
use stateboard_persistence::VersionStore;

pub mod engine;
pub mod remote;
pub mod snapshot;
pub mod worker;

pub use engine::SyncEngine;
pub use remote::{ObjectSource, S3ObjectSource};
pub use snapshot::KeySnapshot;
pub use worker::{run_forever, spawn_sync_worker};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Only keys ending with this suffix are tracked.
    pub suffix: String,
    /// Missing versions of one key fetched at the same time.
    pub fetch_concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            suffix: stateboard_config::DEFAULT_TRACKED_SUFFIX.to_string(),
            fetch_concurrency: stateboard_config::DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

/// Outcome of syncing one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyReport {
    pub current_updated: bool,
    pub versions_fetched: usize,
    pub versions_known: usize,
    pub failures: usize,
    /// Set when the version listing of the key failed.
    pub listing_error: Option<String>,
}

/// Outcome of one full refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub keys: usize,
    /// Set when the key listing failed and the previous snapshot was reused.
    pub listing_error: Option<String>,
    /// Set when the known-version index could not be read; nothing was synced.
    pub index_error: Option<String>,
    pub current_updated: usize,
    pub versions_fetched: usize,
    pub versions_known: usize,
    pub failures: usize,
    /// Keys whose version listing failed.
    pub keys_failed: usize,
}

impl CycleReport {
    pub(crate) fn absorb(&mut self, key: &KeyReport) {
        if key.current_updated {
            self.current_updated += 1;
        }
        self.versions_fetched += key.versions_fetched;
        self.versions_known += key.versions_known;
        self.failures += key.failures;
        if key.listing_error.is_some() {
            self.keys_failed += 1;
        }
    }

    pub fn is_clean(&self) -> bool {
        self.listing_error.is_none()
            && self.index_error.is_none()
            && self.failures == 0
            && self.keys_failed == 0
    }
}

/// Error type for the sync engine and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote listing failed: {0}")]
    RemoteList(String),
    #[error("fetching {key}@{version} failed: {reason}")]
    RemoteFetch {
        key: String,
        version: String,
        reason: String,
    },
    #[error("store write failed: {0}")]
    StoreWrite(String),
    #[error("store read failed: {0}")]
    StoreRead(String),
}

/// Run a synchronous store call on the blocking pool.
pub(crate) async fn blocking_store<T, F>(store: &Arc<dyn VersionStore>, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&dyn VersionStore) -> Result<T, stateboard_persistence::StorageError>
        + Send
        + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| format!("store task failed: {e}"))?
        .map_err(|e| e.to_string())
}

/// Engine reading from an S3-compatible bucket.
pub fn s3_engine(
    client: reqwest::Client,
    s3: &S3Config,
    store: Arc<dyn VersionStore>,
    options: SyncOptions,
) -> Result<SyncEngine, SyncError> {
    let client = S3Client::new(client, s3).map_err(|e| SyncError::RemoteList(e.to_string()))?;
    Ok(SyncEngine::new(
        Arc::new(S3ObjectSource::new(client)),
        store,
        options,
    ))
}
