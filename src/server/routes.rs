//! HTTP routes
//!
//! Thin handlers over the storage, quota and transfer modules. Every failure
//! body is `{success: false, error}` with the status from
//! [`status_code`](crate::error::status_code).

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tower_http::services::ServeDir;

use crate::error::{VaultError, log_error, status_code};
use crate::middleware::log_request;
use crate::server::page::{BrowseView, render_browse, wants_html};
use crate::server::state::AppState;
use crate::storage;
use crate::transfer::UploadRequest;
use crate::utils::{content_disposition, human_size};

const UPLOAD_PATH_HEADER: &str = "x-upload-path";
const FILENAME_HEADER: &str = "x-filename";

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let assets = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/", get(browse_root))
        .route("/browse", get(browse_root))
        .route("/browse/", get(browse_root))
        .route("/browse/{*subpath}", get(browse))
        .route("/download/{*filepath}", get(download))
        .route("/delete/{*filepath}", post(delete))
        .route("/storage-check", post(storage_check))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::disable()),
        )
        .nest_service("/static", assets)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Error response carrying a caller-safe message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Logs `err` for `operation`; `fallback` replaces internal details.
    fn from_vault(operation: &str, fallback: &str, err: VaultError) -> Self {
        log_error(operation, &err);
        Self {
            status: status_code(&err),
            message: err.public_message(fallback),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct BrowseQuery {
    page: Option<String>,
}

impl BrowseQuery {
    fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

async fn browse_root(
    state: State<AppState>,
    headers: HeaderMap,
    query: Query<BrowseQuery>,
) -> Result<Response, ApiError> {
    render_listing(state, headers, String::new(), query).await
}

async fn browse(
    state: State<AppState>,
    headers: HeaderMap,
    Path(subpath): Path<String>,
    query: Query<BrowseQuery>,
) -> Result<Response, ApiError> {
    render_listing(state, headers, subpath, query).await
}

async fn render_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    subpath: String,
    Query(query): Query<BrowseQuery>,
) -> Result<Response, ApiError> {
    let dir = state
        .root
        .resolve(&subpath)
        .map_err(|e| ApiError::from_vault("Browse", "Browse failed", e))?;

    let root = state.root.clone();
    let listing_dir = dir.clone();
    let items = tokio::task::spawn_blocking(move || storage::list_directory(&root, &listing_dir))
        .await
        .map_err(|e| {
            ApiError::from_vault("Browse", "Browse failed", VaultError::Internal(std::io::Error::other(e)))
        })?;

    let free = state.quota.free_space();
    let view = BrowseView {
        path: state.root.relative(&dir),
        page: storage::paginate(items, query.page(), state.page_size),
        breadcrumbs: storage::breadcrumbs(&state.root, &dir),
        storage_left: human_size(free),
        free,
    };
    if wants_html(&headers) {
        Ok(Html(render_browse(&view)).into_response())
    } else {
        Ok(Json(view).into_response())
    }
}

async fn download(
    State(state): State<AppState>,
    Path(filepath): Path<String>,
) -> Result<Response, ApiError> {
    let found = storage::prepare_file_retrieval(&state.root, &filepath)
        .await
        .map_err(|e| ApiError::from_vault("Download", "Download failed", e))?;

    let file = tokio::fs::File::open(&found.file_path).await.map_err(|e| {
        warn!("Failed to open {}: {}", found.file_path.display(), e);
        ApiError::from_vault("Download", "Download failed", VaultError::NotFound("File not found".into()))
    })?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&found.file_name)),
        (header::CONTENT_LENGTH, found.size.to_string()),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

async fn delete(
    State(state): State<AppState>,
    Path(filepath): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = storage::delete_file(&state.root, state.quota.as_ref(), &filepath)
        .await
        .map_err(|e| ApiError::from_vault("Delete", "Delete failed", e))?;
    debug!("Released {} bytes, {} free", deleted.released, state.quota.free_space());
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct StorageCheckRequest {
    // Signed so a negative size is answered instead of rejected.
    #[serde(default)]
    size: i64,
}

impl StorageCheckRequest {
    fn bytes(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }
}

/// Advisory free-space check. Reserves nothing.
async fn storage_check(State(state): State<AppState>, body: Bytes) -> Response {
    match serde_json::from_slice::<StorageCheckRequest>(&body) {
        Ok(request) => {
            let free = state.quota.free_space();
            let available = state.quota.reserve_hint(request.bytes());
            Json(json!({ "available": available, "free": free })).into_response()
        }
        Err(e) => {
            warn!("Malformed storage-check body: {}", e);
            let body = json!({ "available": false, "free": 0, "error": "Malformed request body" });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    }
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<serde_json::Value>, ApiError> {
    let text_header = |name: &str| {
        headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    };

    let request = UploadRequest {
        upload_path: text_header(UPLOAD_PATH_HEADER).unwrap_or_default(),
        filename: text_header(FILENAME_HEADER),
        content_length: headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok()),
    };

    state
        .pipeline
        .handle_upload(request, body.into_data_stream())
        .await
        .map_err(|e| ApiError::from_vault("Upload", "Upload failed", e))?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_page_parsing() {
        let page = |raw: Option<&str>| BrowseQuery { page: raw.map(String::from) }.page();
        assert_eq!(page(None), 1);
        assert_eq!(page(Some("3")), 3);
        assert_eq!(page(Some("abc")), 1);
        assert_eq!(page(Some("-2")), 1);
        // Clamped to 1 later by paginate.
        assert_eq!(page(Some("0")), 0);
    }

    #[test]
    fn test_storage_check_size_clamped() {
        let parse = |body: &str| serde_json::from_str::<StorageCheckRequest>(body).unwrap().bytes();
        assert_eq!(parse(r#"{"size": 2048}"#), 2048);
        assert_eq!(parse(r#"{"size": -5}"#), 0);
        assert_eq!(parse("{}"), 0);
    }

    #[test]
    fn test_api_error_status() {
        let err = ApiError::from_vault(
            "Upload",
            "Upload failed",
            VaultError::Internal(std::io::Error::other("disk controller on fire")),
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Upload failed");

        let err = ApiError::from_vault("Delete", "Delete failed", VaultError::InvalidRequest("Not a file".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Not a file");
    }
}
