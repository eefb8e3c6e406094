use std::time::Duration;

use anyhow::{Context, Result};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use stateboard_core::{version_label, ObjectKey, VersionDescriptor, CURRENT_VERSION};
use stateboard_pipeline::{spawn_sync_worker, CycleReport};
use tokio_util::sync::CancellationToken;

use crate::ConnectionArgs;

pub async fn cmd_serve(conn: ConnectionArgs, bind: String, interval_secs: u64) -> Result<()> {
    let facade = conn.build_facade()?;
    let interval = Duration::from_secs(stateboard_config::clamp_interval_secs(interval_secs));

    println!(":: Serving states from bucket {}", conn.bucket);
    println!("   Listen:   {}", bind);
    println!("   Interval: {}s", interval.as_secs());

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    let cancel = CancellationToken::new();
    let worker = spawn_sync_worker(facade.engine().clone(), interval, cancel.clone());

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            tracing::info!("shutting down");
            cancel.cancel();
        });
    }

    let shutdown = {
        let cancel = cancel.clone();
        async move { cancel.cancelled().await }
    };
    let served = stateboard_server::serve(listener, facade, shutdown).await;

    cancel.cancel();
    worker.await.context("Sync worker panicked")?;
    served.context("HTTP server failed")
}

pub async fn cmd_sync(conn: ConnectionArgs) -> Result<CycleReport> {
    let facade = conn.build_facade()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Syncing bucket {}...", conn.bucket));

    let report = facade.engine().run_cycle().await;
    pb.finish_with_message("Sync complete.");

    println!("\n:: Sync Result");
    println!("   Keys:              {}", report.keys);
    println!("   Current Refreshed: {}", report.current_updated);
    println!("   Versions Fetched:  {}", report.versions_fetched);
    println!("   Versions Known:    {}", report.versions_known);
    println!("   Failures:          {}", report.failures + report.keys_failed);
    if let Some(e) = &report.listing_error {
        println!("   Listing Error:     {}", e);
    }
    if let Some(e) = &report.index_error {
        println!("   Store Error:       {}", e);
    }
    for key in facade.cached_keys() {
        println!("   - {key}");
    }

    Ok(report)
}

pub async fn cmd_keys(conn: ConnectionArgs) -> Result<Vec<ObjectKey>> {
    let facade = conn.build_facade()?;
    let keys = facade
        .list_current_keys()
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", e.summary(), e.details()))?;

    for key in &keys {
        println!("{key}");
    }
    Ok(keys)
}

pub async fn cmd_history(conn: ConnectionArgs, key: String) -> Result<Vec<VersionDescriptor>> {
    let facade = conn.build_facade()?;
    let history = facade
        .list_history(&key)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", e.summary(), e.details()))?;

    println!(":: History of {} ({} versions)", key, history.len());
    for d in &history {
        let size = d
            .size
            .map(|s| format_size(s, DECIMAL))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {}{:<36} {:>10}  {}",
            if d.is_latest { "*" } else { " " },
            d.version_id,
            size,
            d.last_modified.as_deref().unwrap_or("-"),
        );
    }
    Ok(history)
}

pub async fn cmd_show(conn: ConnectionArgs, key: String, version: Option<String>) -> Result<()> {
    let facade = conn.build_facade()?;
    let version = version.unwrap_or_else(|| CURRENT_VERSION.to_string());

    let record = facade
        .get_version(&key, &version)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", e.summary(), e.details()))?;

    match record {
        Some(record) => {
            println!("{}", String::from_utf8_lossy(&record.content));
            Ok(())
        }
        None => anyhow::bail!(
            "{} at version {} is not in the local store (run `sync` first)",
            key,
            version_label(&version)
        ),
    }
}
