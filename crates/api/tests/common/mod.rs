#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use cloudrender_api::auth::jwt::{generate_access_token, JwtConfig};
use cloudrender_api::config::{RequeueConfig, ServerConfig};
use cloudrender_api::router::build_app_router;
use cloudrender_api::state::AppState;
use cloudrender_api::storage::ArtifactStore;
use cloudrender_db::repositories::JobStatusRepo;
use cloudrender_queue::{DispatchQueue, MemoryQueue, QueueKeys};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";
pub const BASE_URL: &str = "http://render.test";
const BOUNDARY: &str = "cloudrender-test-boundary";

/// Build a test `ServerConfig` rooted in `dir`.
///
/// Short pop timeout so empty-queue polls return quickly.
pub fn test_config(dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: String::new(),
        redis_url: String::new(),
        queue_keys: QueueKeys::default(),
        dispatch_pop_timeout: Duration::from_millis(50),
        public_base_url: BASE_URL.to_string(),
        files_input_path: dir.join("input"),
        files_output_path: dir.join("output"),
        max_upload_bytes: 1 << 20,
        api_prefix: String::new(),
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
        },
        requeue: RequeueConfig {
            interval: None,
            stale_after: Duration::from_secs(900),
            batch_size: 100,
        },
    }
}

/// Everything a test needs: the state behind the router and the temp dir
/// that must outlive it.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub dir: TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the application against `pool` with an in-memory queue.
pub async fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, Arc::new(MemoryQueue::new()), |_| {}).await
}

/// Build the application with a custom queue and config tweaks.
pub async fn build_test_app_with(
    pool: PgPool,
    queue: Arc<dyn DispatchQueue>,
    tweak: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    tweak(&mut config);

    let vocabulary = JobStatusRepo::load_vocabulary(&pool).await.unwrap();
    let store = ArtifactStore::new(&config.files_input_path, &config.files_output_path);

    let state = AppState {
        pool,
        config: Arc::new(config),
        queue,
        vocabulary: Arc::new(vocabulary),
        store: Arc::new(store),
    };
    let router = build_app_router(state.clone()).unwrap();

    TestApp { state, router, dir }
}

/// Bearer token for `owner_id`.
pub fn token(owner_id: i64) -> String {
    let config = JwtConfig {
        secret: TEST_SECRET.to_string(),
    };
    generate_access_token(owner_id, chrono::Duration::minutes(15), &config).unwrap()
}

fn authorized(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let request = authorized(Request::builder().method(Method::GET).uri(uri), token)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let request = authorized(Request::builder().method(Method::POST).uri(uri), token)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn put(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// A file part for [`send_multipart`]: `(field name, file name, bytes)`.
pub type FilePart<'a> = (&'a str, &'a str, &'a [u8]);

/// Encode a multipart/form-data body.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((field, file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn send_multipart(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    file: Option<FilePart<'_>>,
) -> Response<Body> {
    let request = authorized(Request::builder().method(method).uri(uri), token)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, file)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Submit a job for `owner_id` through `POST /send`.
pub async fn submit(app: Router, owner_id: i64, format: &str, resolution: &str, file_name: &str) -> Response<Body> {
    send_multipart(
        app,
        Method::POST,
        "/send",
        Some(&token(owner_id)),
        &[("format", format), ("resolution", resolution)],
        Some(("uploadfile", file_name, b"BLENDER-v293")),
    )
    .await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}
