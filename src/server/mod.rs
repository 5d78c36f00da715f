//! REST API server

mod error;
mod images;
mod posts;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use images::IMAGE_FIELD;

use crate::content::MarkdownRenderer;
use crate::store::PostStore;
use crate::MdPost;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub store: PostStore,
    pub renderer: Arc<MarkdownRenderer>,
    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
    /// Image directory as configured, reported back to uploaders
    pub images_dir: PathBuf,
}

impl AppState {
    pub fn new(
        store: PostStore,
        renderer: MarkdownRenderer,
        base_dir: PathBuf,
        images_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            renderer: Arc::new(renderer),
            base_dir,
            images_dir,
        }
    }

    /// Location of the image directory on disk
    pub fn images_path(&self) -> PathBuf {
        self.base_dir.join(&self.images_dir)
    }
}

/// Build the API router
pub fn router(state: AppState, upload_limit: usize) -> Router {
    Router::new()
        // Documents are read whole; only uploads are size-capped
        .route(
            "/posts",
            get(posts::list_posts)
                .post(posts::create_post)
                .layer(DefaultBodyLimit::disable()),
        )
        .route("/posts/", get(posts::missing_slug))
        .route(
            "/posts/:slug",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post)
                .layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/images",
            post(images::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/images/*name", get(images::serve_image))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Permissive cross-origin policy; any OPTIONS request is answered directly
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Start the API server
pub async fn start(mdpost: &MdPost, ip: &str, port: u16) -> Result<()> {
    let store = mdpost.connect().await?;
    let state = AppState::new(
        store,
        MarkdownRenderer::from_config(&mdpost.config.markdown),
        mdpost.base_dir.clone(),
        PathBuf::from(&mdpost.config.images_dir),
    );
    let app = router(state, mdpost.config.upload_limit);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running on {}", addr);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const HELLO: &str = "---\nslug: hello\ntitle: Hi\ndate: 2024-01-01\ntags: [a, b]\n---\n# Hi there";
    const BOUNDARY: &str = "mdpost-test-boundary";

    async fn setup_test_app() -> (Router, AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = PostStore::connect(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let state = AppState::new(
            store,
            MarkdownRenderer::new(),
            temp_dir.path().to_path_buf(),
            PathBuf::from("images"),
        );
        (router(state.clone(), 1024), state, temp_dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Body) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            f = field,
            n = file_name
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        upload_request(Body::from(multipart_body(field, file_name, data)))
    }

    fn upload_request(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/images")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_fetch_post() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "POST", "/posts", Body::from(HELLO)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_text(response).await, "Post created successfully");

        let response = send(&app, "GET", "/posts/hello", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["slug"], "hello");
        assert_eq!(json["title"], "Hi");
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["tags"], serde_json::json!(["a", "b"]));
        assert!(json["content"]
            .as_str()
            .unwrap()
            .contains("<h1>Hi there</h1>"));
    }

    #[tokio::test]
    async fn test_list_posts() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "GET", "/posts", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "[]");

        send(&app, "POST", "/posts", Body::from(HELLO)).await;
        let response = send(&app, "GET", "/posts", Body::empty()).await;
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["slug"], "hello");
    }

    #[tokio::test]
    async fn test_put_updates_post() {
        let (app, state, _temp_dir) = setup_test_app().await;
        send(&app, "POST", "/posts", Body::from(HELLO)).await;

        let updated = "---\nslug: hello\ntitle: Changed\ndate: 2024-02-02\ntags: [c]\n---\nNew body";
        let response = send(&app, "PUT", "/posts/hello", Body::from(updated)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_text(response).await, "Post updated successfully");

        let post = state.store.get("hello").await.unwrap().unwrap();
        assert_eq!(post.title, "Changed");
        assert_eq!(post.tags, vec!["c"]);
        assert!(post.content.contains("New body"));
        assert_eq!(state.store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_creates_missing_post() {
        let (app, state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "PUT", "/posts/hello", Body::from(HELLO)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(state.store.get("hello").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_slug_mismatch_is_rejected() {
        let (app, state, _temp_dir) = setup_test_app().await;

        let doc = "---\nslug: b\ntitle: B\n---\nbody";
        let response = send(&app, "PUT", "/posts/a", Body::from(doc)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "Request slug and frontmatter slug must be the same"
        );
        assert!(state.store.get("a").await.unwrap().is_none());
        assert!(state.store.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_document_is_bad_request() {
        let (app, state, _temp_dir) = setup_test_app().await;

        let doc = "---\nslug: broken\ntitle: Only one separator\n# body";
        let response = send(&app, "POST", "/posts", Body::from(doc)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let text = body_text(response).await;
        assert!(text.starts_with("Failed to parse post"));
        assert!(text.contains("malformed document"));
        assert!(state.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_bad_request() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let doc = "---\nslug: [oops\n---\nbody";
        let response = send(&app, "POST", "/posts", Body::from(doc)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_missing_post() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "GET", "/posts/nope", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Post not found");
    }

    #[tokio::test]
    async fn test_get_empty_slug() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "GET", "/posts/", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Slug is required");
    }

    #[tokio::test]
    async fn test_delete_post() {
        let (app, state, _temp_dir) = setup_test_app().await;
        send(&app, "POST", "/posts", Body::from(HELLO)).await;

        let response = send(&app, "DELETE", "/posts/hello", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Post deleted successfully");
        assert!(state.store.get("hello").await.unwrap().is_none());

        let response = send(&app, "DELETE", "/posts/hello", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let (app, state, _temp_dir) = setup_test_app().await;
        state.store.close().await;

        let response = send(&app, "GET", "/posts", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Failed to fetch posts");

        let response = send(&app, "POST", "/posts", Body::from(HELLO)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Failed to save post");

        let response = send(&app, "GET", "/posts/hello", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Failed to fetch post");

        let response = send(&app, "DELETE", "/posts/hello", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Failed to delete post");
    }

    #[tokio::test]
    async fn test_large_post_is_accepted() {
        let (app, state, _temp_dir) = setup_test_app().await;

        let doc = format!("---\nslug: long\ntitle: Long\n---\n{}", "word ".repeat(600_000));
        assert!(doc.len() > 2 * 1024 * 1024);

        let response = send(&app, "POST", "/posts", Body::from(doc.clone())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = send(&app, "PUT", "/posts/long", Body::from(doc)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let post = state.store.get("long").await.unwrap().unwrap();
        assert!(post.content.len() > 2 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_options_short_circuits_with_cors_headers() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "OPTIONS", "/posts/anything", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_cors_headers_on_errors() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "GET", "/posts/nope", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_upload_then_serve_image() {
        let (app, state, _temp_dir) = setup_test_app().await;
        let data = b"\x89PNG fake image bytes";

        let response = app
            .clone()
            .oneshot(multipart_request(IMAGE_FIELD, "cat.png", data))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            format!("filepath: {}", PathBuf::from("images").join("cat.png").display())
        );
        assert_eq!(
            std::fs::read(state.images_path().join("cat.png")).unwrap(),
            data
        );

        let response = send(&app, "GET", "/images/cat.png", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], &data[..]);
    }

    #[tokio::test]
    async fn test_upload_overwrites_same_name() {
        let (app, state, _temp_dir) = setup_test_app().await;

        app.clone()
            .oneshot(multipart_request(IMAGE_FIELD, "cat.png", b"first"))
            .await
            .unwrap();
        app.clone()
            .oneshot(multipart_request(IMAGE_FIELD, "cat.png", b"second"))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(state.images_path().join("cat.png")).unwrap(),
            b"second"
        );
    }

    #[tokio::test]
    async fn test_upload_keeps_file_inside_images_dir() {
        let (app, state, temp_dir) = setup_test_app().await;

        let response = app
            .clone()
            .oneshot(multipart_request(IMAGE_FIELD, "../escape.png", b"x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.images_path().join("escape.png").exists());
        assert!(!temp_dir.path().join("escape.png").exists());
    }

    #[tokio::test]
    async fn test_upload_without_image_field() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = app
            .clone()
            .oneshot(multipart_request("file", "cat.png", b"data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Error Parsing Multi Part form");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_multipart_body() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "POST", "/images", Body::from("plain")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = app
            .clone()
            .oneshot(multipart_request(IMAGE_FIELD, "big.png", &[0u8; 4096]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_existing_image() {
        let (app, state, _temp_dir) = setup_test_app().await;
        std::fs::create_dir_all(state.images_path()).unwrap();
        std::fs::write(state.images_path().join("cat.png"), b"good").unwrap();

        // Streamed in small chunks so the limit trips after data was written
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
            multipart_body(IMAGE_FIELD, "cat.png", &[7u8; 4096])
                .chunks(128)
                .map(|c| Ok(c.to_vec()))
                .collect();
        let body = Body::from_stream(tokio_stream::iter(chunks));

        let response = app.clone().oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            std::fs::read(state.images_path().join("cat.png")).unwrap(),
            b"good"
        );
        let leftovers = std::fs::read_dir(state.images_path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_missing_image_is_not_found() {
        let (app, _state, _temp_dir) = setup_test_app().await;

        let response = send(&app, "GET", "/images/missing.png", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
