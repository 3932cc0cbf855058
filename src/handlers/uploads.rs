use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Request, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use http::StatusCode;
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handlers::common::ApiPath;
use crate::media_util;
use crate::state::AppState;
use crate::view_models::created;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::bad_request(format!("File too large, the limit is {} bytes", max_bytes))
}

/// Reads past the router's body limit surface as a 413 from the multipart
/// stream and get the same message as an oversized file.
fn read_error(e: MultipartError, max_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text()))
    }
}

pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    user.require_editor()?;
    let mut multipart = multipart.map_err(|e| {
        ApiError::bad_request(format!("Expected a multipart upload: {}", e.body_text()))
    })?;

    let max_bytes = state.config.max_upload_bytes;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let mime_type = field.content_type().unwrap_or_default().to_string();
        let extension = media_util::guess_extension(Some(&mime_type)).ok_or_else(|| {
            ApiError::bad_request(format!(
                "Unsupported file type '{}', expected a JPEG, PNG, GIF, WebP or SVG image",
                mime_type
            ))
        })?;

        let data = field.bytes().await.map_err(|e| read_error(e, max_bytes))?;
        if data.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        if data.len() > max_bytes {
            return Err(too_large(max_bytes));
        }

        let upload_dir = &state.config.upload_dir;
        tokio::fs::create_dir_all(upload_dir)
            .await
            .map_err(|e| ApiError::internal(format!("could not create upload directory: {}", e)))?;

        let filename = media_util::upload_filename(Utc::now().timestamp_millis(), extension);
        tokio::fs::write(upload_dir.join(&filename), &data)
            .await
            .map_err(|e| ApiError::internal(format!("could not store upload: {}", e)))?;

        info!(filename = %filename, size = data.len(), mime = %mime_type, "stored upload");
        return Ok(created(UploadedFile {
            url: format!("{}/{}", crate::UPLOAD_URL_PREFIX, filename),
            filename,
            size: data.len(),
            mime_type,
        }));
    }

    Err(ApiError::missing("file"))
}

pub async fn serve_upload(
    State(state): State<AppState>,
    ApiPath(path): ApiPath<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let file = media_util::resolve_under(&state.config.upload_dir, &path)
        .ok_or_else(|| ApiError::bad_request("Invalid file path"))?;

    match tokio::fs::metadata(&file).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            debug!(path = %path, "upload not found");
            return Err(ApiError::not_found("File not found"));
        }
    }

    match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}
