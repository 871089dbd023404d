//! HTTP-level tests for the client order endpoints.

mod common;

use axum::http::{Method, StatusCode};
use cloudrender_db::models::job::CreateJob;
use cloudrender_db::repositories::JobRepo;
use cloudrender_queue::Lane;
use common::{body_json, get, post, send_multipart, submit, token};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_creates_job_file_and_envelope(pool: PgPool) {
    let test = common::build_test_app(pool.clone()).await;

    let response = submit(test.app(), 7, "png", "1920x1080", "temp.blend").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "OK");
    let id = json["id"].as_i64().unwrap();
    let stored_name = json["stored_name"].as_str().unwrap().to_string();
    assert!(stored_name.ends_with(".blend"));

    let job = JobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(job.owner_id, 7);
    assert_eq!(job.original_name, "temp.blend");
    assert_eq!(job.status_id, 1);
    assert!(job.enqueued_at.is_some());

    let path = test.dir.path().join("input/7").join(&stored_name);
    assert_eq!(std::fs::read(path).unwrap(), b"BLENDER-v293");

    assert_eq!(test.state.queue.len(Lane::Normal).await.unwrap(), 1);
    assert_eq!(test.state.queue.len(Lane::Priority).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_without_token_returns_401(pool: PgPool) {
    let test = common::build_test_app(pool).await;

    let response = send_multipart(
        test.app(),
        Method::POST,
        "/send",
        None,
        &[("format", "png"), ("resolution", "1920x1080")],
        Some(("uploadfile", "temp.blend", b"x")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Error");
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_missing_file_returns_400(pool: PgPool) {
    let test = common::build_test_app(pool.clone()).await;

    let response = send_multipart(
        test.app(),
        Method::POST,
        "/send",
        Some(&token(7)),
        &[("format", "png"), ("resolution", "1920x1080")],
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(JobRepo::list_by_owner(&pool, 7).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_invalid_resolution_returns_400(pool: PgPool) {
    let test = common::build_test_app(pool.clone()).await;

    let response = submit(test.app(), 7, "png", "1080p", "temp.blend").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(JobRepo::list_by_owner(&pool, 7).await.unwrap().is_empty());
    assert!(!test.dir.path().join("input/7").exists());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_send_file_without_extension_returns_400(pool: PgPool) {
    let test = common::build_test_app(pool).await;

    let response = submit(test.app(), 7, "png", "1920x1080", "scene").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_same_second_submissions_get_distinct_names(pool: PgPool) {
    let test = common::build_test_app(pool.clone()).await;

    for _ in 0..3 {
        let response = submit(test.app(), 7, "png", "1920x1080", "temp.blend").await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let jobs = JobRepo::list_by_owner(&pool, 7).await.unwrap();
    let mut names: Vec<_> = jobs.iter().map(|j| j.stored_name.clone()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3);
}

// ---------------------------------------------------------------------------
// Listing and lookup
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_insert_removes_stored_file(pool: PgPool) {
    let test = common::build_test_app(pool.clone()).await;

    // Occupy the stored names the next few seconds would produce.
    let now = chrono::Utc::now().timestamp();
    for ts in now..=now + 2 {
        JobRepo::create(
            &pool,
            &CreateJob {
                owner_id: 7,
                original_name: "taken.blend".into(),
                stored_name: format!("{ts}.blend"),
                format: "png".into(),
                resolution: "640x480".into(),
                status_id: 1,
            },
        )
        .await
        .unwrap();
    }

    let response = submit(test.app(), 7, "png", "1920x1080", "temp.blend").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");

    let left: Vec<_> = std::fs::read_dir(test.dir.path().join("input/7"))
        .unwrap()
        .collect();
    assert!(left.is_empty(), "artifact left behind: {left:?}");
    assert_eq!(test.state.queue.len(Lane::Normal).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_oversized_upload_returns_413(pool: PgPool) {
    let test = common::build_test_app_with(
        pool.clone(),
        std::sync::Arc::new(cloudrender_queue::MemoryQueue::new()),
        |config| config.max_upload_bytes = 64,
    )
    .await;

    let response = submit(test.app(), 7, "png", "1920x1080", "temp.blend").await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Error");
    assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");

    assert!(JobRepo::list_by_owner(&pool, 7).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_orders_lists_only_callers_jobs(pool: PgPool) {
    let test = common::build_test_app(pool).await;
    submit(test.app(), 7, "png", "1920x1080", "mine.blend").await;
    submit(test.app(), 8, "png", "1920x1080", "theirs.blend").await;

    let response = get(test.app(), "/orders", Some(&token(7))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "OK");
    let orders = json["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["filename"], "mine.blend");
    assert_eq!(orders[0]["status"], "in queue");
    assert!(orders[0].get("downloadLink").is_none());

    let date = orders[0]["date"].as_str().unwrap();
    assert_eq!(date, chrono::Utc::now().format("%d-%m-%Y").to_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_get_order_of_other_owner_returns_403(pool: PgPool) {
    let test = common::build_test_app(pool).await;
    let created = body_json(submit(test.app(), 7, "png", "1920x1080", "temp.blend").await).await;
    let id = created["id"].as_i64().unwrap();

    let response = get(test.app(), &format!("/orders/{id}"), Some(&token(8))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_get_missing_order_returns_404(pool: PgPool) {
    let test = common::build_test_app(pool).await;

    let response = get(test.app(), "/orders/999999", Some(&token(7))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_hides_order(pool: PgPool) {
    let test = common::build_test_app(pool.clone()).await;
    let created = body_json(submit(test.app(), 7, "png", "1920x1080", "temp.blend").await).await;
    let id = created["id"].as_i64().unwrap();

    let response = post(test.app(), &format!("/orders/{id}/delete"), Some(&token(7))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "OK");

    let response = get(test.app(), &format!("/orders/{id}"), Some(&token(7))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(get(test.app(), "/orders", Some(&token(7))).await).await;
    assert!(json["orders"].as_array().unwrap().is_empty());

    // Still addressable for auditing.
    let audit = JobRepo::find_by_id_including_deleted(&pool, id).await.unwrap().unwrap();
    assert!(audit.is_deleted);

    let response = post(test.app(), &format!("/orders/{id}/delete"), Some(&token(7))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Prefix mounting
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_client_routes_nest_under_prefix(pool: PgPool) {
    let queue = std::sync::Arc::new(cloudrender_queue::MemoryQueue::new());
    let test = common::build_test_app_with(pool, queue, |config| {
        config.api_prefix = "/api".to_string();
    })
    .await;

    let response = get(test.app(), "/api/orders", Some(&token(7))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(test.app(), "/orders", Some(&token(7))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Worker routes stay at the root.
    let response = get(test.app(), "/request", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
