use super::*;
use crate::checker::IndexChecker;
use crate::checker::test_helpers::{TestParts, create_test_checker_with, fast_config, wait_for_job};
use crate::credentials::Credential;
use crate::test_helpers::fresh_credential;
use crate::types::JobId;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

mod credentials;

const ADMIN_KEY: &str = "admin-secret";

/// Who a test request claims to be
#[derive(Clone, Copy)]
enum As {
    Admin,
    User(i64),
    Anonymous,
}

struct TestApp {
    router: Router,
    checker: Arc<IndexChecker>,
    parts: TestParts,
}

/// Router over a test checker; user 1 holds `credits`
async fn test_app(credentials: Vec<Credential>, credits: i64) -> TestApp {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = fast_config(&temp_dir);
    config.api.admin_key = Some(ADMIN_KEY.to_string());
    config.api.swagger_ui = false;

    let (checker, parts) = create_test_checker_with(config, temp_dir, credentials, credits).await;
    let checker = Arc::new(checker);
    let router = create_router(checker.clone(), Arc::new(checker.config().clone()));

    TestApp {
        router,
        checker,
        parts,
    }
}

async fn default_app() -> TestApp {
    test_app(vec![fresh_credential(1, "k1", 100)], 10).await
}

fn request(method: &str, uri: &str, who: As, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    builder = match who {
        As::Admin => builder.header("X-Api-Key", ADMIN_KEY),
        As::User(id) => builder.header("X-User-Id", id.to_string()),
        As::Anonymous => builder,
    };

    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and decode the JSON body (Null when empty or not JSON)
async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn finished(app: &TestApp, id: i64) {
    wait_for_job(&app.checker, JobId(id)).await;
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let app = default_app().await;

    let (status, body) = send(&app, request("GET", "/jobs", As::Anonymous, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn cors_headers_are_added_when_enabled() {
    let app = default_app().await;

    let req = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn cors_can_be_disabled() {
    let app = default_app().await;
    let mut config = app.checker.config().clone();
    config.api.cors_enabled = false;
    let router = create_router(app.checker.clone(), Arc::new(config));

    let req = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn swagger_ui_is_mounted_when_enabled() {
    let app = default_app().await;
    let mut config = app.checker.config().clone();
    config.api.swagger_ui = true;
    let router = create_router(app.checker.clone(), Arc::new(config));

    let req = Request::builder()
        .uri("/swagger-ui/")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn server_stops_when_checker_shuts_down() {
    let app = default_app().await;
    let mut config = app.checker.config().clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let handle = tokio::spawn(start_api_server(app.checker.clone(), Arc::new(config)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    app.checker.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
