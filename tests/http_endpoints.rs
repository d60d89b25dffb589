//! HTTP Endpoint Tests
//!
//! Drives the assembled router with bundled extensions through
//! `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use itemgate::bulk::{DATA_REQUIRED, IDS_REQUIRED};
use itemgate::extensions::posts_hooks::ARCHIVED_MESSAGE;
use itemgate::{App, Config};
use serde_json::{json, Value};
use tower::ServiceExt;

// =============================================================================
// Helpers
// =============================================================================

const ADMIN: &str = "admin-token";
const EDITOR: &str = "editor-token";
const ADMIN_ID: &str = "6f9619ff-8b86-d011-b42d-00c04fc964ff";

fn router() -> Router {
    let config = Config::from_json_str(&format!(
        r#"{{
            "permissions": {{
                "rules": [
                    {{ "collection": "posts", "actions": ["read"] }},
                    {{ "collection": "posts", "role": "editor", "actions": ["create", "read", "update"] }}
                ]
            }},
            "tokens": [
                {{
                    "token": "{ADMIN}",
                    "user": {{ "id": "{ADMIN_ID}", "email": "admin@example.com",
                              "firstName": "Ada", "lastName": "Admin" }},
                    "role": {{ "name": "administrator" }}
                }},
                {{
                    "token": "{EDITOR}",
                    "user": {{ "id": "0b7c9a52-4c35-4f0e-8d3e-5f1f2e8b9a10" }},
                    "role": {{ "name": "editor" }}
                }}
            ]
        }}"#
    ))
    .unwrap();

    App::builder(config)
        .with_bundled_extensions()
        .build()
        .unwrap()
        .router()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// =============================================================================
// Health and profile
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = router();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_user_profile_requires_user() {
    let app = router();
    let (status, body) = send(&app, Method::GET, "/user-profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized", "code": 401}));
}

#[tokio::test]
async fn test_unknown_token_rejected() {
    let app = router();
    let (status, _) = send(&app, Method::GET, "/user-profile", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_profile() {
    let app = router();
    let (status, body) = send(&app, Method::GET, "/user-profile", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], ADMIN_ID);
    assert_eq!(body["data"]["email"], "admin@example.com");
    assert_eq!(body["data"]["firstName"], "Ada");
    assert_eq!(body["data"]["role"]["name"], "administrator");
}

// =============================================================================
// Stats
// =============================================================================

#[tokio::test]
async fn test_stats_forbidden_for_non_admin() {
    let app = router();
    let (status, body) = send(&app, Method::GET, "/stats/posts", Some(EDITOR), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_stats_counts_items() {
    let app = router();
    for title in ["a", "b"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/items/posts",
            Some(EDITOR),
            Some(json!({"title": title, "status": "draft"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, Method::GET, "/stats/posts", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "data": {"collection": "posts", "totalCount": 2}})
    );
}

// =============================================================================
// Bulk update
// =============================================================================

#[tokio::test]
async fn test_bulk_update_validation() {
    let app = router();

    let (status, body) = send(
        &app,
        Method::POST,
        "/bulk-update/posts",
        None,
        Some(json!({"data": {"status": "published"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], IDS_REQUIRED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/bulk-update/posts",
        Some(ADMIN),
        Some(json!({"ids": [1]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], DATA_REQUIRED);
}

#[tokio::test]
async fn test_bulk_update_breakdown() {
    let app = router();
    send(
        &app,
        Method::POST,
        "/items/posts",
        Some(EDITOR),
        Some(json!({"title": "a", "status": "draft"})),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/bulk-update/posts",
        Some(ADMIN),
        Some(json!({"ids": [1, 99], "data": {"status": "published"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["successful"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["results"][0]["id"], 1);
    assert_eq!(body["data"]["results"][1]["success"], false);
}

// =============================================================================
// Items
// =============================================================================

#[tokio::test]
async fn test_items_lifecycle() {
    let app = router();

    let (status, body) = send(
        &app,
        Method::POST,
        "/items/posts",
        Some(EDITOR),
        Some(json!({"title": "Hello", "status": "published"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["id"], 1);

    let (status, body) = send(&app, Method::GET, "/items/posts/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Hello");
    assert!(body["data"]["created_by"].is_string());

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/items/posts/1",
        Some(EDITOR),
        Some(json!({"title": "Hello again"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // editors hold no delete grant
    let (status, _) = send(&app, Method::DELETE, "/items/posts/1", Some(EDITOR), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::DELETE, "/items/posts/42", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, body) = send(&app, Method::DELETE, "/items/posts/1", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], ARCHIVED_MESSAGE);

    let (status, body) = send(&app, Method::GET, "/items/posts/1", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Hello again");
    assert_eq!(body["data"]["archived"], true);
}

#[tokio::test]
async fn test_anonymous_sees_only_published() {
    let app = router();
    for (title, status) in [("a", "draft"), ("b", "published")] {
        send(
            &app,
            Method::POST,
            "/items/posts",
            Some(EDITOR),
            Some(json!({"title": title, "status": status})),
        )
        .await;
    }

    let (status, body) = send(&app, Method::GET, "/items/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "b");

    let (_, body) = send(&app, Method::GET, "/items/posts/1", None, None).await;
    assert_eq!(body["code"], 404);
}
