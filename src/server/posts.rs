//! `/posts` handlers

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::content::Post;

/// GET /posts
pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<Post>>> {
    let posts = state
        .store
        .list()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch posts", e))?;
    Ok(Json(posts))
}

/// GET /posts/ (no slug)
pub async fn missing_slug() -> ApiError {
    ApiError::bad_request("Slug is required")
}

/// GET /posts/{slug}
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Post>> {
    if slug.is_empty() {
        return Err(missing_slug().await);
    }

    state
        .store
        .get(&slug)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch post", e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

/// POST /posts
pub async fn create_post(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, &'static str)> {
    save_post(&state, None, body).await?;
    Ok((StatusCode::CREATED, "Post created successfully"))
}

/// PUT /posts/{slug}
pub async fn update_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, &'static str)> {
    save_post(&state, Some(&slug), body).await?;
    Ok((StatusCode::CREATED, "Post updated successfully"))
}

/// DELETE /posts/{slug}
pub async fn delete_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<&'static str> {
    state
        .store
        .delete(&slug)
        .await
        .map_err(|e| ApiError::internal("Failed to delete post", e))?;
    Ok("Post deleted successfully")
}

/// Parse a document body and upsert it. POST and PUT share this path.
async fn save_post(
    state: &AppState,
    path_slug: Option<&str>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<()> {
    let body = body.map_err(|e| {
        tracing::warn!("Failed to read request body: {}", e);
        ApiError::bad_request("Failed to read request body")
    })?;

    let post = Post::parse(&body, &state.renderer)
        .map_err(|e| ApiError::bad_request(format!("Failed to parse post: {}", e)))?;

    if let Some(slug) = path_slug.filter(|s| !s.is_empty()) {
        if slug != post.slug {
            return Err(ApiError::bad_request(
                "Request slug and frontmatter slug must be the same",
            ));
        }
    }

    state
        .store
        .upsert(&post)
        .await
        .map_err(|e| ApiError::internal("Failed to save post", e))
}
