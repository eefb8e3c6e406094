use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod delta;
pub mod keys;

/// Key of a tracked object in the remote store, e.g. `env/prod.tfstate`.
pub type ObjectKey = String;

/// Remote-assigned revision identifier. See [`CURRENT_VERSION`].
pub type VersionId = String;

/// Sentinel version id for "whatever the object holds right now".
pub const CURRENT_VERSION: &str = "";

pub fn is_current_version(version_id: &str) -> bool {
    version_id == CURRENT_VERSION
}

/// Human-facing name of a version id for logs and messages.
pub fn version_label(version_id: &str) -> &str {
    if is_current_version(version_id) {
        "current"
    } else {
        version_id
    }
}

/// A fetched revision of an object, as persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub key: ObjectKey,
    pub version_id: VersionId,
    pub content: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn new(key: impl Into<ObjectKey>, version_id: impl Into<VersionId>, content: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            version_id: version_id.into(),
            content,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_current(&self) -> bool {
        is_current_version(&self.version_id)
    }
}

/// One entry of a remote version listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub key: ObjectKey,
    pub version_id: VersionId,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub etag: Option<String>,
}

impl VersionDescriptor {
    pub fn new(key: impl Into<ObjectKey>, version_id: impl Into<VersionId>) -> Self {
        Self {
            key: key.into(),
            version_id: version_id.into(),
            is_latest: false,
            last_modified: None,
            size: None,
            etag: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_version_id_is_the_current_sentinel() {
        assert!(is_current_version(""));
        assert!(!is_current_version("null"));
        assert!(VersionRecord::new("a.tfstate", "", b"{}".to_vec()).is_current());
    }

    #[test]
    fn descriptor_uses_camel_case_on_the_wire() {
        let mut d = VersionDescriptor::new("a.tfstate", "v1");
        d.is_latest = true;
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["versionId"], "v1");
        assert_eq!(json["isLatest"], true);
    }
}
