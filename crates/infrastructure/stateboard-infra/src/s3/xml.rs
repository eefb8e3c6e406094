//! Response bodies of the S3 listing calls.
//!
//! Only the fields we use are declared; everything else in the document is
//! ignored by the deserializer.

use serde::Deserialize;

use super::{ObjectSummary, ObjectVersion};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListBucketResult {
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_continuation_token: Option<String>,
    #[serde(default)]
    pub contents: Vec<Contents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Contents {
    pub key: String,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default, rename = "ETag")]
    pub etag: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// `Version` and `DeleteMarker` entries interleave in this document, which
/// is why quick-xml is built with `overlapped-lists`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListVersionsResult {
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_key_marker: Option<String>,
    #[serde(default)]
    pub next_version_id_marker: Option<String>,
    #[serde(default, rename = "Version")]
    pub versions: Vec<Version>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Version {
    pub key: String,
    pub version_id: String,
    #[serde(default)]
    pub is_latest: bool,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default, rename = "ETag")]
    pub etag: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn unquote(etag: Option<String>) -> Option<String> {
    etag.map(|e| e.trim_matches('"').to_string())
}

impl From<Contents> for ObjectSummary {
    fn from(c: Contents) -> Self {
        Self {
            key: c.key,
            last_modified: c.last_modified,
            size: c.size,
            etag: unquote(c.etag),
        }
    }
}

impl From<Version> for ObjectVersion {
    fn from(v: Version) -> Self {
        Self {
            key: v.key,
            version_id: v.version_id,
            is_latest: v.is_latest,
            last_modified: v.last_modified,
            size: v.size,
            etag: unquote(v.etag),
        }
    }
}

pub(crate) fn decode<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, quick_xml::DeError> {
    let text = String::from_utf8_lossy(body);
    quick_xml::de::from_str(&text)
}

/// Best-effort summary of an S3 error document, falling back to the raw body.
pub(crate) fn error_message(body: &[u8]) -> String {
    match decode::<ErrorBody>(body) {
        Ok(ErrorBody {
            code: Some(code),
            message,
        }) => match message {
            Some(m) => format!("{code}: {m}"),
            None => code,
        },
        _ => String::from_utf8_lossy(body).trim().chars().take(200).collect(),
    }
}
