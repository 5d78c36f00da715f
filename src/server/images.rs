//! `/images` handlers

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, Request, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tower_http::services::ServeDir;

use super::error::{ApiError, ApiResult};
use super::AppState;

/// Multipart field carrying the uploaded file
pub const IMAGE_FIELD: &str = "image";

fn bad_form() -> ApiError {
    ApiError::bad_request("Error Parsing Multi Part form")
}

/// POST /images
///
/// Stores the `image` field under its original file name, replacing any
/// earlier upload with the same name, and answers with the stored path.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<String> {
    let mut multipart = multipart.map_err(|_| bad_form())?;

    let mut field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(IMAGE_FIELD) => break field,
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return Err(bad_form()),
        }
    };

    // Only the last path component is kept so uploads stay inside the directory
    let file_name = field
        .file_name()
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_os_string())
        .ok_or_else(bad_form)?;

    let images_dir = state.images_path();
    tokio::fs::create_dir_all(&images_dir)
        .await
        .map_err(|e| ApiError::internal("Error creating server directory", e))?;

    // Stream into a scratch file so a failed upload never touches an existing image
    let temp_path = images_dir.join(temp_name(&file_name));
    if let Err(err) = write_field(&mut field, &temp_path).await {
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            tracing::warn!("Failed to remove {}: {}", temp_path.display(), e);
        }
        return Err(err);
    }

    if let Err(e) = tokio::fs::rename(&temp_path, images_dir.join(&file_name)).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(ApiError::internal("Error Copying file to server", e));
    }

    let file_path = state.images_dir.join(&file_name);
    tracing::info!("Stored image: {}", file_path.display());
    Ok(format!("filepath: {}", file_path.display()))
}

/// Scratch name for an upload in progress, unique within the process
fn temp_name(file_name: &OsStr) -> OsString {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let mut name = OsString::from(".");
    name.push(file_name);
    name.push(format!(".{}.part", NEXT.fetch_add(1, Ordering::Relaxed)));
    name
}

/// Copy a multipart field into a new file at `path`
async fn write_field(field: &mut Field<'_>, path: &Path) -> ApiResult<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::internal("Error creating file on server", e))?;

    while let Some(chunk) = field.chunk().await.map_err(|_| bad_form())? {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal("Error Copying file to server", e))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::internal("Error Copying file to server", e))
}

/// GET /images/{name}
pub async fn serve_image(State(state): State<AppState>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();

    // ServeDir resolves the URI path against the directory root
    let rest = parts
        .uri
        .path()
        .strip_prefix("/images")
        .unwrap_or("/")
        .to_string();
    parts.uri = match rest.parse::<Uri>() {
        Ok(uri) => uri,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let mut service = ServeDir::new(state.images_path());
    match service.try_call(Request::from_parts(parts, body)).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}
