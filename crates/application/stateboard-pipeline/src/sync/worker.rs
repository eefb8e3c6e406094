use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::sync::SyncEngine;

/// Run cycles back to back, sleeping `interval` after each one, until
/// `cancel` fires. The first cycle starts immediately.
pub async fn run_forever(engine: Arc<SyncEngine>, interval: Duration, cancel: CancellationToken) {
    info!(interval_secs = interval.as_secs(), "sync worker started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            report = engine.run_cycle() => {
                debug!(?report, "cycle report");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!("sync worker stopped");
}

pub fn spawn_sync_worker(
    engine: Arc<SyncEngine>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_forever(engine, interval, cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ObjectSource, SyncError, SyncOptions};
    use stateboard_core::{ObjectKey, VersionDescriptor, VersionId, VersionRecord};
    use stateboard_persistence::{InsertOutcome, StorageError, VersionStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        listings: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ObjectSource for CountingSource {
        async fn list_keys(&self, _suffix: &str) -> Result<Vec<ObjectKey>, SyncError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn list_versions(&self, _key: &str) -> Result<Vec<VersionDescriptor>, SyncError> {
            Ok(Vec::new())
        }

        async fn fetch_content(&self, key: &str, version_id: &str) -> Result<Vec<u8>, SyncError> {
            Err(SyncError::RemoteFetch {
                key: key.into(),
                version: version_id.into(),
                reason: "unused".into(),
            })
        }
    }

    struct EmptyStore;

    impl VersionStore for EmptyStore {
        fn insert(&self, _: &str, _: &str, _: &[u8]) -> Result<InsertOutcome, StorageError> {
            Ok(InsertOutcome::Inserted)
        }

        fn get(&self, _: &str, _: &str) -> Result<Option<VersionRecord>, StorageError> {
            Ok(None)
        }

        fn list_known_version_ids(&self) -> Result<Vec<VersionId>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn cycles_repeat_on_interval_and_stop_on_cancel() {
        let source = Arc::new(CountingSource::default());
        let engine = Arc::new(SyncEngine::new(
            source.clone(),
            Arc::new(EmptyStore),
            SyncOptions::default(),
        ));
        let cancel = CancellationToken::new();
        let handle = spawn_sync_worker(engine, Duration::from_millis(40), cancel.clone());

        tokio::time::sleep(Duration::from_millis(300)).await;
        let seen = source.listings.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected repeated cycles, saw {seen}");

        cancel.cancel();
        handle.await.unwrap();
        let stopped_at = source.listings.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(source.listings.load(Ordering::SeqCst), stopped_at);
    }

    #[tokio::test]
    async fn cancel_interrupts_the_sleep() {
        let engine = Arc::new(SyncEngine::new(
            Arc::new(CountingSource::default()),
            Arc::new(EmptyStore),
            SyncOptions::default(),
        ));
        let cancel = CancellationToken::new();
        let handle = spawn_sync_worker(engine, Duration::from_secs(3600), cancel.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
