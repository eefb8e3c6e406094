pub mod commands;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Args;
use directories::ProjectDirs;
use stateboard_config::{
    DEFAULT_FETCH_CONCURRENCY, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_S3_ENDPOINT,
    DEFAULT_TRACKED_SUFFIX,
};
use stateboard_infra::S3Config;
use stateboard_persistence::RedbVersionStore;
use stateboard_pipeline::{s3_engine, QueryFacade, SyncOptions};

const QUALIFIER: &str = "io";
const ORG: &str = "stateboard";
const APP: &str = "stateboard";

/// Where states come from and where their history is kept.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Bucket holding the state files
    #[arg(long, env = "AWS_BUCKET")]
    pub bucket: String,
    #[arg(long, env = "S3_ENDPOINT", default_value = DEFAULT_S3_ENDPOINT)]
    pub endpoint: String,
    /// Only keys ending with this suffix are tracked
    #[arg(long, env = "STATEBOARD_SUFFIX", default_value = DEFAULT_TRACKED_SUFFIX)]
    pub suffix: String,
    /// Directory holding stateboard.redb (defaults to the platform data dir)
    #[arg(long, env = "STATEBOARD_DB")]
    pub db: Option<Utf8PathBuf>,
    #[arg(long, env = "STATEBOARD_CONCURRENCY", default_value_t = DEFAULT_FETCH_CONCURRENCY)]
    pub concurrency: usize,
    /// Max object store requests per second
    #[arg(long, env = "STATEBOARD_RATE_LIMIT")]
    pub rate_limit: Option<u32>,
    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout: u64,
}

impl ConnectionArgs {
    pub fn data_root(&self) -> Result<Utf8PathBuf> {
        if let Some(db) = &self.db {
            return Ok(db.clone());
        }
        let proj_dirs = ProjectDirs::from(QUALIFIER, ORG, APP)
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Utf8PathBuf::from_path_buf(proj_dirs.data_dir().to_path_buf())
            .map_err(|p| anyhow::anyhow!("Data directory is not UTF-8: {}", p.display()))
    }

    /// Open the local store and wire an engine to the bucket.
    pub fn build_facade(&self) -> Result<QueryFacade> {
        let root = self.data_root()?;
        let store = RedbVersionStore::open(&root)
            .with_context(|| format!("Failed to open store under {root}"))?;
        tracing::debug!(path = %store.path(), "opened version store");

        let client = stateboard_infra::default_http_client(Duration::from_secs(self.http_timeout))
            .context("Failed to build HTTP client")?;
        let s3 = S3Config {
            endpoint: self.endpoint.clone(),
            bucket: self.bucket.clone(),
            requests_per_second: self.rate_limit,
        };
        let options = SyncOptions {
            suffix: self.suffix.clone(),
            fetch_concurrency: self.concurrency,
        };
        let engine = s3_engine(client, &s3, Arc::new(store), options)
            .context("Invalid object store settings")?;
        Ok(QueryFacade::new(Arc::new(engine)))
    }
}
