use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use camino::Utf8PathBuf;
use stateboard_infra::S3Config;
use stateboard_persistence::{RedbVersionStore, VersionStore};
use stateboard_pipeline::{s3_engine, QueryFacade, SyncOptions};

/// Object key -> versions, oldest first. The last entry is the latest content.
type Bucket = Arc<Mutex<BTreeMap<String, Vec<(String, String)>>>>;

async fn bucket(
    State(objects): State<Bucket>,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let objects = objects.lock().unwrap();
    let mut body = String::new();

    if q.contains_key("versions") {
        let prefix = q.get("prefix").cloned().unwrap_or_default();
        body.push_str("<ListVersionsResult><IsTruncated>false</IsTruncated>");
        for (key, versions) in objects.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            for (i, (id, _)) in versions.iter().enumerate().rev() {
                let latest = i + 1 == versions.len();
                body.push_str(&format!(
                    "<Version><Key>{key}</Key><VersionId>{id}</VersionId><IsLatest>{latest}</IsLatest></Version>"
                ));
            }
        }
        body.push_str("</ListVersionsResult>");
        return body.into_response();
    }

    body.push_str("<ListBucketResult><IsTruncated>false</IsTruncated>");
    for (key, versions) in objects.iter() {
        let size = versions.last().map(|(_, c)| c.len()).unwrap_or(0);
        body.push_str(&format!(
            "<Contents><Key>{key}</Key><Size>{size}</Size></Contents>"
        ));
    }
    body.push_str("</ListBucketResult>");
    body.into_response()
}

async fn object(
    State(objects): State<Bucket>,
    Path(key): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let objects = objects.lock().unwrap();
    let Some(versions) = objects.get(&key) else {
        return (
            StatusCode::NOT_FOUND,
            "<Error><Code>NoSuchKey</Code></Error>".to_string(),
        )
            .into_response();
    };
    let found = match q.get("versionId") {
        Some(v) => versions.iter().find(|(id, _)| id == v),
        None => versions.last(),
    };
    match found {
        Some((_, content)) => content.clone().into_response(),
        None => (
            StatusCode::NOT_FOUND,
            "<Error><Code>NoSuchVersion</Code></Error>".to_string(),
        )
            .into_response(),
    }
}

async fn start_mock_s3(objects: Bucket) -> SocketAddr {
    let app = Router::new()
        .route("/states", get(bucket))
        .route("/states/*key", get(object))
        .with_state(objects);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn seeded_bucket() -> Bucket {
    let mut objects = BTreeMap::new();
    objects.insert(
        "a.tfstate".to_string(),
        vec![
            ("v1".to_string(), r#"{"serial":1}"#.to_string()),
            ("v2".to_string(), r#"{"serial":2}"#.to_string()),
        ],
    );
    objects.insert(
        "a.tfstate.backup".to_string(),
        vec![("bk1".to_string(), "{}".to_string())],
    );
    objects.insert(
        "env/b.tfstate".to_string(),
        vec![("w1".to_string(), r#"{"serial":7}"#.to_string())],
    );
    objects.insert(
        "notes.txt".to_string(),
        vec![("n1".to_string(), "hello".to_string())],
    );
    Arc::new(Mutex::new(objects))
}

fn facade(addr: SocketAddr, store: Arc<RedbVersionStore>) -> QueryFacade {
    let engine = s3_engine(
        reqwest::Client::new(),
        &S3Config {
            endpoint: format!("http://{addr}"),
            bucket: "states".into(),
            requests_per_second: None,
        },
        store,
        SyncOptions::default(),
    )
    .unwrap();
    QueryFacade::new(Arc::new(engine))
}

#[tokio::test]
async fn sync_cycles_mirror_bucket_history_into_redb() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let store = Arc::new(RedbVersionStore::open(&root).unwrap());

    let objects = seeded_bucket();
    let addr = start_mock_s3(objects.clone()).await;
    let facade = facade(addr, store.clone());
    let engine = facade.engine().clone();

    let report = engine.run_cycle().await;
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.keys, 2);
    assert_eq!(report.versions_fetched, 3);

    let mut known = store.list_known_version_ids().unwrap();
    known.sort();
    assert_eq!(known, vec!["v1", "v2", "w1"]);

    let current = store.get("a.tfstate", "").unwrap().unwrap();
    assert_eq!(current.content, br#"{"serial":2}"#);

    // A new revision lands remotely between cycles.
    objects
        .lock()
        .unwrap()
        .get_mut("a.tfstate")
        .unwrap()
        .push(("v3".to_string(), r#"{"serial":3}"#.to_string()));

    let report = engine.run_cycle().await;
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.versions_fetched, 1);
    assert_eq!(report.versions_known, 3);

    let current = facade.get_version("a.tfstate", "").await.unwrap().unwrap();
    assert_eq!(current.content, br#"{"serial":3}"#);
    let v1 = facade.get_version("a.tfstate", "v1").await.unwrap().unwrap();
    assert_eq!(v1.content, br#"{"serial":1}"#);
    assert!(facade.get_version("a.tfstate", "nope").await.unwrap().is_none());
    assert!(facade.get_version("a.tfstate", "bk1").await.unwrap().is_none());
}

#[tokio::test]
async fn query_facade_reads_keys_and_history_from_the_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let store = Arc::new(RedbVersionStore::open(&root).unwrap());

    let addr = start_mock_s3(seeded_bucket()).await;
    let facade = facade(addr, store);

    assert!(facade.cached_keys().is_empty());
    let keys = facade.list_current_keys().await.unwrap();
    assert_eq!(keys, vec!["a.tfstate", "env/b.tfstate"]);
    assert_eq!(facade.cached_keys(), keys);

    let history = facade.list_history("a.tfstate").await.unwrap();
    let ids: Vec<_> = history.iter().map(|d| d.version_id.as_str()).collect();
    assert_eq!(ids, vec!["v2", "v1"]);
    assert!(history[0].is_latest);
}

#[tokio::test]
async fn unreachable_bucket_is_reported_not_panicked() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let store = Arc::new(RedbVersionStore::open(&root).unwrap());

    // Bind and drop to get a port nobody listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let facade = facade(addr, store);

    let report = facade.engine().run_cycle().await;
    assert!(report.listing_error.is_some());
    assert_eq!(report.keys, 0);

    let err = facade.list_current_keys().await.unwrap_err();
    assert_eq!(err.summary(), "Failed to list states");
}
