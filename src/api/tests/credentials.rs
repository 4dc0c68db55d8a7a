use super::*;
use serde_json::json;

#[tokio::test]
async fn status_shows_pool_to_admin_and_balance_to_user() {
    let app = default_app().await;

    let (status, body) = send(&app, request("GET", "/credentials/status", As::Admin, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["total_jobs"], 0);
    assert_eq!(body["total_remaining"], 100);
    assert_eq!(body["credentials"][0]["status"], "active");
    assert!(body["credentials"][0].get("key_value").is_none());

    let (status, body) = send(
        &app,
        request("GET", "/credentials/status", As::User(1), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user_credits": 10, "is_admin": false}));
}

#[tokio::test]
async fn unknown_user_status_is_not_found() {
    let app = default_app().await;

    let (status, _) = send(
        &app,
        request("GET", "/credentials/status", As::User(77), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_is_admin_only() {
    let app = default_app().await;
    app.parts.provider.set_balance("k1", 55);

    let (status, _) = send(
        &app,
        request("POST", "/credentials/refresh", As::User(1), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request("POST", "/credentials/refresh", As::Admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["credentials"][0]["remaining"], 55);
}

#[tokio::test]
async fn credentials_can_be_added_and_removed() {
    let app = default_app().await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/credentials",
            As::Admin,
            Some(json!({"key_value": "k2", "name": "Backup"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();
    assert_eq!(app.checker.pool_status().await.credentials.len(), 2);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/credentials/{id}"), As::Admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.checker.pool_status().await.credentials.len(), 1);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/credentials/{id}"), As::Admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/credentials",
            As::User(1),
            Some(json!({"key_value": "k3"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
