use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stateboard_core::{ObjectKey, VersionDescriptor, VersionId, VersionRecord, CURRENT_VERSION};
use stateboard_pipeline::{QueryError, QueryFacade};

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub details: String,
    #[serde(skip)]
    status: StatusCode,
}

impl ApiError {
    fn from_query(status: StatusCode, err: &QueryError) -> Self {
        tracing::warn!(error = %err, "api request failed");
        Self {
            error: err.summary(),
            details: err.details(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// A stored record as returned by `/api/state`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub path: ObjectKey,
    pub version_id: VersionId,
    pub fetched_at: DateTime<Utc>,
    /// Parsed JSON when the content is JSON, else the content as text.
    pub content: serde_json::Value,
}

impl From<VersionRecord> for StateView {
    fn from(record: VersionRecord) -> Self {
        let content = serde_json::from_slice(&record.content).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&record.content).into_owned())
        });
        Self {
            path: record.key,
            version_id: record.version_id,
            fetched_at: record.fetched_at,
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionParam {
    versionid: Option<String>,
}

pub(crate) async fn list_states(
    State(facade): State<QueryFacade>,
) -> Result<Json<Vec<ObjectKey>>, ApiError> {
    facade
        .list_current_keys()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_query(StatusCode::BAD_GATEWAY, &e))
}

pub(crate) async fn get_state(
    State(facade): State<QueryFacade>,
    Path(key): Path<String>,
    Query(param): Query<VersionParam>,
) -> Result<Json<Option<StateView>>, ApiError> {
    let version = param.versionid.unwrap_or_else(|| CURRENT_VERSION.to_string());
    facade
        .get_version(&key, &version)
        .await
        .map(|record| Json(record.map(StateView::from)))
        .map_err(|e| ApiError::from_query(StatusCode::INTERNAL_SERVER_ERROR, &e))
}

pub(crate) async fn get_history(
    State(facade): State<QueryFacade>,
    Path(key): Path<String>,
) -> Result<Json<Vec<VersionDescriptor>>, ApiError> {
    facade
        .list_history(&key)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_query(StatusCode::BAD_GATEWAY, &e))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
