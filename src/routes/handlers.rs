//! Request handlers for the storage API endpoints

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::stream::StreamExt;
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use crate::errors::ApiError;
use crate::routes::{AppState, MoveQuery};

const UPLOAD_FIELD_ERROR: &str = "file key configuration error";
const OPEN_FILE_ERROR: &str = "error opening file";
const UPLOAD_ERROR: &str = "error uploading file";
const DOWNLOAD_ERROR: &str = "error retrieving file";
const LIST_ERROR: &str = "error listing files";
const MOVE_ERROR: &str = "error moving file";
const DELETE_ERROR: &str = "error deleting file";

fn success() -> Json<Value> {
    Json(json!({ "message": "success" }))
}

/// Last path segment of a client-supplied file name, so `dir/a.txt` uploads as `a.txt`
fn base_name(file_name: &str) -> String {
    let trimmed = file_name.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}

/// Health check endpoint
#[instrument]
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe endpoint
#[instrument]
pub async fn ready() -> impl IntoResponse {
    (StatusCode::OK, "Ready")
}

/// Prometheus metrics endpoint
#[instrument]
pub async fn metrics() -> Response {
    use crate::metrics::REGISTRY;
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!(error = %e, "Metrics encoding failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    ([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response()
}

/// Upload - POST /upload
///
/// Streams the form field named by the configured file field into the
/// bucket, using the base name of the part's file name as the object name.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        error!(error = %e, "Upload request is not a multipart form");
        ApiError::internal(UPLOAD_FIELD_ERROR, e.body_text())
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal(UPLOAD_FIELD_ERROR, e.body_text()))?
    {
        if field.name() != Some(&*state.file_field) {
            continue;
        }

        let Some(file_name) = field.file_name().map(base_name) else {
            error!(field = %state.file_field, "Upload field carries no file");
            return Err(ApiError::internal(OPEN_FILE_ERROR, "form field is not a file"));
        };
        info!(file = %file_name, "Upload request");

        let file = field.map(|chunk| chunk.map_err(std::io::Error::other)).boxed();
        state.storage.upload(&file_name, Some(file)).await.map_err(|e| {
            error!(file = %file_name, error = %e, "Storage upload failed");
            ApiError::internal(UPLOAD_ERROR, e)
        })?;

        return Ok(success());
    }

    error!(field = %state.file_field, "Upload form has no file field");
    Err(ApiError::internal(UPLOAD_FIELD_ERROR, "http: no such file"))
}

/// Download - GET /download/:filename
#[instrument(skip(state))]
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    info!(file = %filename, "Download request");

    let data = state.storage.get(&filename).await.map_err(|e| {
        error!(file = %filename, error = %e, "Storage get failed");
        ApiError::from_storage(DOWNLOAD_ERROR, &e)
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())],
        data,
    )
        .into_response())
}

/// List - GET /list
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    info!("List request");

    let files = state.storage.list().await.map_err(|e| {
        let listed = e.partial_listing().map_or(0, <[String]>::len);
        error!(error = %e, listed, "Storage list failed");
        ApiError::from_storage(LIST_ERROR, &e)
    })?;

    Ok(Json(json!({ "files": files })))
}

/// Move - PUT /move/:filename?folder=...
#[instrument(skip(state))]
pub async fn move_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(params): Query<MoveQuery>,
) -> Result<Json<Value>, ApiError> {
    info!(file = %filename, folder = %params.folder, "Move request");

    state
        .storage
        .move_object(&filename, &params.folder)
        .await
        .map_err(|e| {
            error!(file = %filename, folder = %params.folder, error = %e, "Storage move failed");
            ApiError::from_storage(MOVE_ERROR, &e)
        })?;

    Ok(success())
}

/// Delete - DELETE /delete/:filename
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, ApiError> {
    info!(file = %filename, "Delete request");

    state.storage.delete(&filename).await.map_err(|e| {
        error!(file = %filename, error = %e, "Storage delete failed");
        ApiError::from_storage(DELETE_ERROR, &e)
    })?;

    Ok(success())
}
