//! HTTP surface tests against an in-memory SQLite database.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use orgchart::{db, routes, AppState, Config};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = Database::connect(opt).await.unwrap();
    db::migrate(&conn).await.unwrap();
    routes::create_router(AppState::new(conn, Config::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn organization_lifecycle() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "/api/organization/add", Some(json!({ "name": "Root" }))).await;
    assert_eq!(status, StatusCode::OK);
    let root = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(
        &app,
        "POST",
        "/api/organization/add",
        Some(json!({ "name": "TECH", "parentId": root, "description": "R&D" })),
    )
    .await;
    let tech = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", &format!("/api/organization/path?id={tech}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullPath"], "Root > TECH");
    assert_eq!(body["data"]["level"], 1);

    // Root under its own child
    let (status, body) = send(
        &app,
        "POST",
        "/api/organization/move",
        Some(json!({ "id": root, "parentId": tech })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Circular Reference");

    let (status, body) = send(&app, "POST", "/api/organization/delete", Some(json!({ "id": root }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Has Children");

    // Absent description stays, explicit null clears
    let (_, body) = send(
        &app,
        "POST",
        "/api/organization/update",
        Some(json!({ "id": tech, "name": "Technology" })),
    )
    .await;
    assert_eq!(body["data"]["description"], "R&D");
    let (_, body) = send(
        &app,
        "POST",
        "/api/organization/update",
        Some(json!({ "id": tech, "description": null, "valid": false })),
    )
    .await;
    assert_eq!(body["data"]["description"], Value::Null);
    assert_eq!(body["data"]["valid"], false);

    let (_, body) = send(&app, "GET", "/api/organization/tree", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["data"][0]["children"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        "POST",
        "/api/organization/delete",
        Some(json!({ "id": root, "force": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 2);
}

#[tokio::test]
async fn validation_and_not_found() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "/api/organization/add", Some(json!({ "name": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation Error");

    let missing = uuid::Uuid::now_v7();
    let (status, _) = send(&app, "GET", &format!("/api/organization/query?id={missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn membership_flow() {
    let app = app().await;

    let (_, body) = send(&app, "POST", "/api/organization/add", Some(json!({ "name": "TECH" }))).await;
    let tech = body["data"]["id"].as_str().unwrap().to_string();

    let join = json!({
        "user": { "id": "u-1", "identifier": "alice" },
        "organizationId": tech,
        "isPrimary": true
    });
    let (status, body) = send(&app, "POST", "/api/membership/join", Some(join.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_primary"], true);

    let (status, body) = send(&app, "POST", "/api/membership/join", Some(join)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Duplicate Membership");

    let (status, body) = send(
        &app,
        "POST",
        "/api/membership/leave",
        Some(json!({ "userId": "u-1", "organizationId": tech })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], 1);

    let (_, body) = send(&app, "GET", "/api/membership/logs?userId=u-1", None).await;
    let logs = body["data"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1]["content"], "user alice left organization TECH");
}

#[tokio::test]
async fn organization_delete_cascades_to_memberships() {
    let app = app().await;

    let (_, body) = send(&app, "POST", "/api/organization/add", Some(json!({ "name": "HR" }))).await;
    let hr = body["data"]["id"].as_str().unwrap().to_string();
    let join = json!({
        "user": { "id": "u-1", "identifier": "alice" },
        "organizationId": hr,
        "isPrimary": false
    });
    send(&app, "POST", "/api/membership/join", Some(join)).await;

    let (status, _) = send(&app, "POST", "/api/organization/delete", Some(json!({ "id": hr }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/membership/user?userId=u-1", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (_, body) = send(&app, "GET", "/api/membership/logs?userId=u-1", None).await;
    assert_eq!(body["data"][1]["content"], "user alice left organization HR");
}
