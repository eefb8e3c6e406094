//! Minimal anonymous client for the S3 REST API.
//!
//! Path-style addressing (`{endpoint}/{bucket}/{key}`) only. Requests are
//! unsigned, so the bucket must allow anonymous reads or sit behind a
//! gateway that signs for us.

mod xml;

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Url};

use crate::net::{request_limiter, RequestLimiter};

/// Everything but RFC 3986 unreserved characters gets escaped.
const S3_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub requests_per_second: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Option<String>,
    pub size: Option<u64>,
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
    pub last_modified: Option<String>,
    pub size: Option<u64>,
    pub etag: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum S3Error {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("{operation} request failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned HTTP {status}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },
    #[error("{operation} response could not be decoded: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: quick_xml::DeError,
    },
    #[error("{operation} reported a truncated listing without a continuation marker")]
    Pagination { operation: &'static str },
}

pub struct S3Client {
    client: Client,
    bucket_url: Url,
    limiter: Option<Arc<RequestLimiter>>,
}

impl S3Client {
    pub fn new(client: Client, config: &S3Config) -> Result<Self, S3Error> {
        let invalid = |reason: String| S3Error::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason,
        };

        if config.bucket.is_empty() || config.bucket.contains('/') {
            return Err(invalid(format!("bad bucket name {:?}", config.bucket)));
        }

        let mut bucket_url = Url::parse(&config.endpoint).map_err(|e| invalid(e.to_string()))?;
        if bucket_url.cannot_be_a_base() {
            return Err(invalid("endpoint cannot be a base url".into()));
        }
        let base_path = bucket_url.path().trim_end_matches('/').to_string();
        bucket_url.set_path(&format!("{base_path}/{}", encode(&config.bucket)));
        bucket_url.set_query(None);

        Ok(Self {
            client,
            bucket_url,
            limiter: request_limiter(config.requests_per_second),
        })
    }

    pub fn bucket_url(&self) -> &Url {
        &self.bucket_url
    }

    /// ListObjectsV2, following continuation tokens until exhausted.
    pub async fn list_objects(&self, prefix: Option<&str>) -> Result<Vec<ObjectSummary>, S3Error> {
        const OP: &str = "ListObjectsV2";
        let mut out = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = vec![("list-type", Some("2"))];
            if let Some(p) = prefix {
                query.push(("prefix", Some(p)));
            }
            if let Some(t) = token.as_deref() {
                query.push(("continuation-token", Some(t)));
            }
            let url = self.url_for("", &query);

            let body = self.send(OP, url).await?;
            let page: xml::ListBucketResult =
                xml::decode(&body).map_err(|source| S3Error::Decode { operation: OP, source })?;
            out.extend(page.contents.into_iter().map(ObjectSummary::from));

            match (page.is_truncated, page.next_continuation_token) {
                (true, Some(next)) => token = Some(next),
                (true, None) => return Err(S3Error::Pagination { operation: OP }),
                (false, _) => break,
            }
        }

        Ok(out)
    }

    /// ListObjectVersions for every key starting with `prefix`.
    ///
    /// Delete markers are dropped.
    pub async fn list_object_versions(&self, prefix: &str) -> Result<Vec<ObjectVersion>, S3Error> {
        const OP: &str = "ListObjectVersions";
        let mut out = Vec::new();
        let mut markers: Option<(String, Option<String>)> = None;

        loop {
            let mut query = vec![("versions", None), ("prefix", Some(prefix))];
            if let Some((key_marker, version_marker)) = markers.as_ref() {
                query.push(("key-marker", Some(key_marker.as_str())));
                if let Some(v) = version_marker.as_deref() {
                    query.push(("version-id-marker", Some(v)));
                }
            }
            let url = self.url_for("", &query);

            let body = self.send(OP, url).await?;
            let page: xml::ListVersionsResult =
                xml::decode(&body).map_err(|source| S3Error::Decode { operation: OP, source })?;
            out.extend(page.versions.into_iter().map(ObjectVersion::from));

            match (page.is_truncated, page.next_key_marker) {
                (true, Some(key_marker)) => {
                    markers = Some((key_marker, page.next_version_id_marker));
                }
                (true, None) => return Err(S3Error::Pagination { operation: OP }),
                (false, _) => break,
            }
        }

        Ok(out)
    }

    /// GetObject. `version_id = None` reads the latest revision.
    pub async fn get_object(&self, key: &str, version_id: Option<&str>) -> Result<Vec<u8>, S3Error> {
        let query: Vec<(&str, Option<&str>)> = match version_id {
            Some(v) => vec![("versionId", Some(v))],
            None => Vec::new(),
        };
        let url = self.url_for(key, &query);
        self.send("GetObject", url).await
    }

    fn url_for(&self, key: &str, query: &[(&str, Option<&str>)]) -> Url {
        let mut url = self.bucket_url.clone();
        if !key.is_empty() {
            let encoded: Vec<String> = key.split('/').map(encode).collect();
            url.set_path(&format!("{}/{}", url.path(), encoded.join("/")));
        }
        if !query.is_empty() {
            let q: Vec<String> = query
                .iter()
                .map(|(k, v)| match v {
                    Some(v) => format!("{}={}", encode(k), encode(v)),
                    None => encode(k),
                })
                .collect();
            url.set_query(Some(&q.join("&")));
        }
        url
    }

    async fn send(&self, operation: &'static str, url: Url) -> Result<Vec<u8>, S3Error> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        tracing::debug!(operation, %url, "s3 request");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| S3Error::Request { operation, source })?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| S3Error::Request { operation, source })?;

        if !status.is_success() {
            return Err(S3Error::Status {
                operation,
                status: status.as_u16(),
                message: xml::error_message(&bytes),
            });
        }
        Ok(bytes.to_vec())
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, S3_ENCODE_SET).to_string()
}
