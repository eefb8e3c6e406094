use std::sync::Arc;

use futures::StreamExt;
use stateboard_core::delta::{build_index, for_key, missing_versions, KnownVersionIndex};
use stateboard_core::{version_label, ObjectKey, VersionId, CURRENT_VERSION};
use stateboard_persistence::{InsertOutcome, VersionStore};
use tracing::{debug, error, info, warn};

use crate::sync::remote::ObjectSource;
use crate::sync::snapshot::KeySnapshot;
use crate::sync::{blocking_store, CycleReport, KeyReport, SyncError, SyncOptions};

/// Keeps a [`VersionStore`] in step with the version history of a remote
/// [`ObjectSource`].
///
/// The engine is shared behind an `Arc` by the background worker and the
/// read path. Only [`SyncEngine::run_cycle`] writes records, and cycles are
/// serialized by an internal lock.
pub struct SyncEngine {
    source: Arc<dyn ObjectSource>,
    store: Arc<dyn VersionStore>,
    snapshot: Arc<KeySnapshot>,
    options: SyncOptions,
    cycle_guard: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn ObjectSource>,
        store: Arc<dyn VersionStore>,
        options: SyncOptions,
    ) -> Self {
        let options = SyncOptions {
            fetch_concurrency: stateboard_config::clamp_fetch_concurrency(
                options.fetch_concurrency,
            ),
            ..options
        };
        Self {
            source,
            store,
            snapshot: Arc::new(KeySnapshot::new()),
            options,
            cycle_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<KeySnapshot> {
        self.snapshot.clone()
    }

    pub(crate) fn source(&self) -> &dyn ObjectSource {
        self.source.as_ref()
    }

    pub(crate) fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// List tracked keys and swap them into the snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh_keys(&self) -> Result<Arc<[ObjectKey]>, SyncError> {
        let keys = self.source.list_keys(&self.options.suffix).await?;
        debug!(count = keys.len(), "refreshed key snapshot");
        Ok(self.snapshot.replace(keys))
    }

    /// One enumeration of the store, reused for every key of a cycle.
    pub async fn known_version_index(&self) -> Result<KnownVersionIndex, SyncError> {
        let ids = blocking_store(&self.store, |s| s.list_known_version_ids())
            .await
            .map_err(SyncError::StoreRead)?;
        Ok(build_index(ids))
    }

    /// Refresh the current record of `key`, then ingest every remote version
    /// missing from `known`.
    ///
    /// Failures are logged and counted in the report. A failed version
    /// listing ends the key early but keeps the current-record outcome.
    pub async fn sync_key(&self, key: &str, known: &KnownVersionIndex) -> KeyReport {
        let mut report = KeyReport::default();

        match self.ingest(key, CURRENT_VERSION).await {
            Ok(_) => report.current_updated = true,
            Err(e) => {
                error!(%key, error = %e, "failed to refresh current state");
                report.failures += 1;
            }
        }

        let listing = match self.source.list_versions(key).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(%key, error = %e, "failed to list versions");
                report.listing_error = Some(e.to_string());
                return report;
            }
        };
        let delta = missing_versions(for_key(key, listing), known);

        for d in &delta.known {
            debug!(%key, version = %d.version_id, "version already known, skipping");
        }
        report.versions_known = delta.known.len();

        let results: Vec<(VersionId, Result<InsertOutcome, SyncError>)> =
            futures::stream::iter(delta.missing)
                .map(|d| async move {
                    let res = self.ingest(key, &d.version_id).await;
                    (d.version_id, res)
                })
                .buffer_unordered(self.options.fetch_concurrency)
                .collect()
                .await;

        for (version_id, res) in results {
            match res {
                Ok(InsertOutcome::AlreadyPresent) => report.versions_known += 1,
                Ok(_) => {
                    debug!(%key, version = %version_id, "stored version");
                    report.versions_fetched += 1;
                }
                Err(e) => {
                    warn!(%key, version = %version_id, error = %e, "failed to ingest version");
                    report.failures += 1;
                }
            }
        }

        report
    }

    /// Refresh the snapshot, then sync every key in it, one key at a time.
    ///
    /// Never fails: every error is logged and reflected in the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.cycle_guard.lock().await;
        let mut report = CycleReport::default();

        let keys = match self.refresh_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                error!(error = %e, "failed to refresh key listing, keeping previous snapshot");
                report.listing_error = Some(e.to_string());
                self.snapshot.load()
            }
        };
        report.keys = keys.len();

        let known = match self.known_version_index().await {
            Ok(known) => known,
            Err(e) => {
                error!(error = %e, "failed to read known versions, skipping cycle");
                report.index_error = Some(e.to_string());
                return report;
            }
        };

        for key in keys.iter() {
            let key_report = self.sync_key(key, &known).await;
            report.absorb(&key_report);
        }

        info!(
            keys = report.keys,
            current = report.current_updated,
            fetched = report.versions_fetched,
            known = report.versions_known,
            failures = report.failures + report.keys_failed,
            "sync cycle finished"
        );
        report
    }

    async fn ingest(&self, key: &str, version_id: &str) -> Result<InsertOutcome, SyncError> {
        let content = self.source.fetch_content(key, version_id).await?;
        let (k, v) = (key.to_string(), version_id.to_string());
        blocking_store(&self.store, move |s| s.insert(&k, &v, &content))
            .await
            .map_err(|e| {
                SyncError::StoreWrite(format!("{key}@{}: {e}", version_label(version_id)))
            })
    }
}
