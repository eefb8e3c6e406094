use stateboard_core::keys::tracked_keys;
use stateboard_core::{is_current_version, version_label, ObjectKey, VersionDescriptor};
use stateboard_infra::{ObjectVersion, S3Client};

use crate::sync::SyncError;

/// Read access to the remote object store.
#[async_trait::async_trait]
pub trait ObjectSource: Send + Sync {
    /// Keys of every object whose name ends with `suffix`, in listing order.
    async fn list_keys(&self, suffix: &str) -> Result<Vec<ObjectKey>, SyncError>;

    /// Every historical version the remote reports for `key`.
    async fn list_versions(&self, key: &str) -> Result<Vec<VersionDescriptor>, SyncError>;

    /// Content of `key` at `version_id`; the empty id reads the latest content.
    async fn fetch_content(&self, key: &str, version_id: &str) -> Result<Vec<u8>, SyncError>;
}

/// [`ObjectSource`] over an S3-compatible bucket.
pub struct S3ObjectSource {
    client: S3Client,
}

impl S3ObjectSource {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

fn descriptor(v: ObjectVersion) -> VersionDescriptor {
    VersionDescriptor {
        key: v.key,
        version_id: v.version_id,
        is_latest: v.is_latest,
        last_modified: v.last_modified,
        size: v.size,
        etag: v.etag,
    }
}

#[async_trait::async_trait]
impl ObjectSource for S3ObjectSource {
    async fn list_keys(&self, suffix: &str) -> Result<Vec<ObjectKey>, SyncError> {
        let objects = self
            .client
            .list_objects(None)
            .await
            .map_err(|e| SyncError::RemoteList(format!("list objects: {e}")))?;
        Ok(tracked_keys(objects.into_iter().map(|o| o.key), suffix))
    }

    async fn list_versions(&self, key: &str) -> Result<Vec<VersionDescriptor>, SyncError> {
        let versions = self
            .client
            .list_object_versions(key)
            .await
            .map_err(|e| SyncError::RemoteList(format!("list versions of {key}: {e}")))?;
        Ok(versions.into_iter().map(descriptor).collect())
    }

    async fn fetch_content(&self, key: &str, version_id: &str) -> Result<Vec<u8>, SyncError> {
        let version = (!is_current_version(version_id)).then_some(version_id);
        self.client
            .get_object(key, version)
            .await
            .map_err(|e| SyncError::RemoteFetch {
                key: key.to_string(),
                version: version_label(version_id).to_string(),
                reason: e.to_string(),
            })
    }
}
