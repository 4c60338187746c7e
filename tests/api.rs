//! End-to-end API tests
//!
//! Runs the full router against an in-memory database. The predictor points
//! at an unroutable endpoint so classification exercises the threshold
//! fallback path, which is also the realistic deployment failure mode.

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use lactron::api::{build_router, AppState};
use lactron::config::PredictorConfig;
use lactron::db::create_test_pool;
use lactron::db::repositories::{
    SqlxBatchRepository, SqlxHistoryRepository, SqlxReadingRepository,
    SqlxSecurityQuestionRepository, SqlxSessionRepository, SqlxUserRepository,
};
use lactron::services::{
    BatchService, HistoryService, HttpPredictor, ReadingService, RecoveryService, UserService,
};

async fn test_server() -> TestServer {
    let pool = create_test_pool().await.expect("Failed to create test pool");

    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let question_repo = SqlxSecurityQuestionRepository::boxed(pool.clone());

    // Nothing listens on the discard port; predict() fails fast
    let predictor = Arc::new(
        HttpPredictor::new(&PredictorConfig {
            url: "http://127.0.0.1:9/predict".to_string(),
            timeout_secs: 1,
        })
        .unwrap(),
    );

    let state = AppState {
        user_service: Arc::new(UserService::new(
            user_repo.clone(),
            SqlxSessionRepository::boxed(pool.clone()),
            question_repo.clone(),
        )),
        recovery_service: Arc::new(RecoveryService::new(pool.clone(), user_repo, question_repo)),
        batch_service: Arc::new(BatchService::new(SqlxBatchRepository::boxed(pool.clone()))),
        reading_service: Arc::new(ReadingService::new(
            SqlxReadingRepository::boxed(pool.clone()),
            predictor,
        )),
        history_service: Arc::new(HistoryService::new(SqlxHistoryRepository::boxed(pool))),
    };

    TestServer::new(build_router(state, "http://localhost:3000")).unwrap()
}

async fn signup(server: &TestServer, email: &str) -> String {
    let signup = server
        .post("/api/v1/auth/signup")
        .json(&json!({
            "email": email,
            "name": "Dairy Collector",
            "password": "secret123",
            "security_question_id": 1,
            "security_answer": "Rex",
        }))
        .await;
    signup.assert_status(StatusCode::CREATED);

    let body: Value = signup.json();
    assert_eq!(body["success"], true);
    body["data"]["token"].as_str().unwrap().to_string()
}

fn bearer(token: &str) -> (header::HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

#[tokio::test]
async fn test_health() {
    let server = test_server().await;

    let response = server.get("/api/v1/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_signup_login_me() {
    let server = test_server().await;
    let token = signup(&server, "farm@example.com").await;

    let (name, value) = bearer(&token);
    let me = server.get("/api/v1/auth/me").add_header(name, value).await;
    me.assert_status_ok();

    let body: Value = me.json();
    assert_eq!(body["data"]["email"], "farm@example.com");
    // Secrets never leave the API
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_signup_opens_session() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/auth/signup")
        .json(&json!({
            "email": "fresh@example.com",
            "name": "Dairy Collector",
            "password": "secret123",
            "security_question_id": 1,
            "security_answer": "Rex",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    // Session cookie arrives with the account
    let cookie = response.cookie("session");
    assert!(!cookie.value().is_empty());

    // The body token opens protected routes without a login round trip
    let body: Value = response.json();
    let token = body["data"]["token"].as_str().unwrap();
    let (name, value) = bearer(token);
    let me = server.get("/api/v1/auth/me").add_header(name, value).await;
    me.assert_status_ok();
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let server = test_server().await;

    for path in ["/api/v1/batches", "/api/v1/history", "/api/v1/auth/me"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_duplicate_signup_is_conflict() {
    let server = test_server().await;
    signup(&server, "dup@example.com").await;

    let again = server
        .post("/api/v1/auth/signup")
        .json(&json!({
            "email": "dup@example.com",
            "name": "Other",
            "password": "secret123",
            "security_question_id": 1,
            "security_answer": "Rex",
        }))
        .await;
    again.assert_status(StatusCode::CONFLICT);

    let body: Value = again.json();
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_batch_lifecycle() {
    let server = test_server().await;
    let token = signup(&server, "batch@example.com").await;
    let (name, value) = bearer(&token);

    // Register
    let create = server
        .post("/api/v1/batches")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "batch_id": "MB-001",
            "collector_name": "Collector",
            "collection_datetime": "2026-03-01 08:30",
        }))
        .await;
    create.assert_status(StatusCode::CREATED);
    let body: Value = create.json();
    assert_eq!(body["data"]["status"], "good");
    assert_eq!(body["data"]["reading_count"], 0);

    // Same id again is a conflict
    let dup = server
        .post("/api/v1/batches")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "batch_id": "MB-001",
            "collector_name": "Collector",
            "collection_datetime": "2026-03-01 09:00",
        }))
        .await;
    dup.assert_status(StatusCode::CONFLICT);

    // Status update
    let update = server
        .put("/api/v1/batches/MB-001/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "status": "spoiled" }))
        .await;
    update.assert_status_ok();
    let body: Value = update.json();
    assert_eq!(body["data"]["status"], "spoiled");

    // Unknown status is a validation error
    let bad = server
        .put("/api/v1/batches/MB-001/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "status": "curdled" }))
        .await;
    bad.assert_status(StatusCode::BAD_REQUEST);

    // Missing batch is 404
    let missing = server
        .put("/api/v1/batches/MB-404/status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "status": "good" }))
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);

    // Delete, then it is gone
    let delete = server
        .delete("/api/v1/batches/MB-001")
        .add_header(name.clone(), value.clone())
        .await;
    delete.assert_status_ok();

    let gone = server
        .get("/api/v1/batches/MB-001")
        .add_header(name, value)
        .await;
    gone.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_id_claimed_across_users() {
    let server = test_server().await;
    let first = signup(&server, "first@example.com").await;
    let second = signup(&server, "second@example.com").await;

    let (name, value) = bearer(&first);
    server
        .post("/api/v1/batches")
        .add_header(name, value)
        .json(&json!({
            "batch_id": "MB-SHARED",
            "collector_name": "A",
            "collection_datetime": "2026-03-01 08:30",
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let (name, value) = bearer(&second);
    let stolen = server
        .post("/api/v1/batches")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "batch_id": "MB-SHARED",
            "collector_name": "B",
            "collection_datetime": "2026-03-02 08:30",
        }))
        .await;
    stolen.assert_status(StatusCode::CONFLICT);

    // And the second user cannot see the first user's batch
    let list = server
        .get("/api/v1/batches")
        .add_header(name, value)
        .await;
    let body: Value = list.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_reading_ingestion_with_fallback() {
    let server = test_server().await;
    let token = signup(&server, "sensor@example.com").await;
    let (name, value) = bearer(&token);

    // Full payload over the spoilage thresholds
    let spoiled = server
        .post("/api/v1/readings")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "batch_id": "MB-1",
            "ethanol": 250.0,
            "ammonia": 5.0,
            "h2s": 2.0,
        }))
        .await;
    spoiled.assert_status(StatusCode::CREATED);
    let body: Value = spoiled.json();
    assert_eq!(body["data"]["status"], "spoiled");
    assert_eq!(body["data"]["shelf_life"], 0.0);
    assert_eq!(body["data"]["fallback"], true);

    // Sparse payload: gases default to zero, batch to DEFAULT
    let sparse = server
        .post("/api/v1/readings")
        .add_header(name.clone(), value.clone())
        .json(&json!({}))
        .await;
    sparse.assert_status(StatusCode::CREATED);
    let body: Value = sparse.json();
    assert_eq!(body["data"]["batch_id"], "DEFAULT");
    assert_eq!(body["data"]["status"], "good");

    // Latest scoped to MB-1
    let latest = server
        .get("/api/v1/readings/latest?batch_id=MB-1")
        .add_header(name.clone(), value.clone())
        .await;
    latest.assert_status_ok();
    let body: Value = latest.json();
    assert_eq!(body["data"]["ethanol"], 250.0);

    // Unscoped latest returns the DEFAULT reading (newest overall)
    let overall = server
        .get("/api/v1/readings/latest")
        .add_header(name.clone(), value.clone())
        .await;
    let body: Value = overall.json();
    assert_eq!(body["data"]["ethanol"], 0.0);

    // History for MB-1
    let history = server
        .get("/api/v1/readings/history?batch_id=MB-1")
        .add_header(name, value)
        .await;
    let body: Value = history.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_history_archive_once() {
    let server = test_server().await;
    let token = signup(&server, "archive@example.com").await;
    let (name, value) = bearer(&token);

    let snapshot = json!({
        "batch_id": "MB-9",
        "collector_name": "Collector",
        "collection_datetime": "2026-03-01 08:30",
        "ethanol": 220.0,
        "ammonia": 12.0,
        "h2s": 4.0,
        "grade": "spoiled",
        "shelf_life": 0.0,
    });

    let save = server
        .post("/api/v1/history")
        .add_header(name.clone(), value.clone())
        .json(&snapshot)
        .await;
    save.assert_status(StatusCode::CREATED);
    let body: Value = save.json();
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["grade"], "SPOILED");

    // Second archive of the same batch is rejected
    let again = server
        .post("/api/v1/history")
        .add_header(name.clone(), value.clone())
        .json(&snapshot)
        .await;
    again.assert_status(StatusCode::CONFLICT);

    // Fetch and delete
    let get = server
        .get(&format!("/api/v1/history/{}", id))
        .add_header(name.clone(), value.clone())
        .await;
    get.assert_status_ok();

    let delete = server
        .delete(&format!("/api/v1/history/{}", id))
        .add_header(name.clone(), value.clone())
        .await;
    delete.assert_status_ok();

    let gone = server
        .delete(&format!("/api/v1/history/{}", id))
        .add_header(name, value)
        .await;
    gone.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recovery_flow() {
    let server = test_server().await;
    signup(&server, "recover@example.com").await;

    // Look up the registered question
    let forgot = server
        .post("/api/v1/auth/forgot")
        .json(&json!({ "email": "recover@example.com" }))
        .await;
    forgot.assert_status_ok();
    let body: Value = forgot.json();
    assert_eq!(body["data"]["id"], 1);

    // Wrong answer is rejected as a mismatch, not an auth failure
    let wrong = server
        .post("/api/v1/auth/verify-answer")
        .json(&json!({ "email": "recover@example.com", "answer": "rex" }))
        .await;
    wrong.assert_status(StatusCode::CONFLICT);

    let body: Value = wrong.json();
    assert_eq!(body["code"], "CONFLICT");

    // Exact answer mints a token
    let verify = server
        .post("/api/v1/auth/verify-answer")
        .json(&json!({ "email": "recover@example.com", "answer": "Rex" }))
        .await;
    verify.assert_status_ok();
    let body: Value = verify.json();
    let reset_token = body["data"]["reset_token"].as_str().unwrap().to_string();

    // Spend it
    let reset = server
        .post("/api/v1/auth/reset-password")
        .json(&json!({ "token": reset_token, "new_password": "changed123" }))
        .await;
    reset.assert_status_ok();

    // Old password no longer works, new one does
    let old = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "recover@example.com", "password": "secret123" }))
        .await;
    old.assert_status(StatusCode::UNAUTHORIZED);

    let new = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "recover@example.com", "password": "changed123" }))
        .await;
    new.assert_status_ok();

    // Token is single use
    let replay = server
        .post("/api/v1/auth/reset-password")
        .json(&json!({ "token": body["data"]["reset_token"], "new_password": "again123" }))
        .await;
    replay.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_closes_session() {
    let server = test_server().await;
    let token = signup(&server, "bye@example.com").await;
    let (name, value) = bearer(&token);

    server
        .post("/api/v1/auth/logout")
        .add_header(name.clone(), value.clone())
        .await
        .assert_status_ok();

    let me = server.get("/api/v1/auth/me").add_header(name, value).await;
    me.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_questions_catalog_is_public() {
    let server = test_server().await;

    let response = server.get("/api/v1/auth/questions").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
}
