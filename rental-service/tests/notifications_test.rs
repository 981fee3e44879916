mod common;

use axum::http::{Method, StatusCode};
use chrono::DateTime;
use common::TestApp;
use serde_json::{json, Value};
use uuid::Uuid;

const MARK_READ: &str = "/api/notifications/mark-read";

async fn create(app: &TestApp, caller: Uuid, target: Uuid, title: &str) -> Value {
    let res = app
        .request(
            Method::POST,
            "/api/notifications",
            Some(caller),
            Some(json!({
                "userId": target,
                "type": "system",
                "title": title,
                "message": "Something happened",
                "data": { "source": "test" }
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    res.body["data"].clone()
}

async fn mark_read(app: &TestApp, user: Uuid, body: Value) -> common::TestResponse {
    app.request(Method::PATCH, MARK_READ, Some(user), Some(body))
        .await
}

#[tokio::test]
async fn create_returns_unread_notification() {
    let app = TestApp::new();
    let user = app.user();

    let created = create(&app, user, user, "Welcome").await;

    assert_eq!(created["userId"], user.to_string());
    assert_eq!(created["type"], "system");
    assert_eq!(created["isRead"], false);
    assert_eq!(created["readUtc"], Value::Null);
    assert_eq!(created["data"]["source"], "test");
}

#[tokio::test]
async fn create_validates_lengths() {
    let app = TestApp::new();
    let user = app.user();

    let res = app
        .request(
            Method::POST,
            "/api/notifications",
            Some(user),
            Some(json!({
                "userId": user,
                "type": "system",
                "title": "x".repeat(201),
                "message": "hi"
            })),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn create_for_unknown_user_is_bad_request() {
    let app = TestApp::new();
    let user = app.user();

    let res = app
        .request(
            Method::POST,
            "/api/notifications",
            Some(user),
            Some(json!({
                "userId": Uuid::new_v4(),
                "type": "system",
                "title": "Hi",
                "message": "hi"
            })),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_newest_first_with_unread_count() {
    let app = TestApp::new();
    let user = app.user();
    let other = app.user();
    create(&app, user, user, "first").await;
    create(&app, user, user, "second").await;
    create(&app, user, other, "not yours").await;

    let res = app.get("/api/notifications", user).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["unreadCount"], 2);
    let data = res.body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|n| n["userId"] == user.to_string()));
    let created_at = |n: &Value| {
        DateTime::parse_from_rfc3339(n["createdUtc"].as_str().unwrap()).unwrap()
    };
    assert!(created_at(&data[0]) >= created_at(&data[1]));
}

#[tokio::test]
async fn list_honours_unread_only_and_limit() {
    let app = TestApp::new();
    let user = app.user();
    let read = create(&app, user, user, "old").await;
    create(&app, user, user, "a").await;
    create(&app, user, user, "b").await;
    let read_id = read["notificationId"].clone();
    mark_read(&app, user, json!({ "notificationIds": [read_id] })).await;

    let unread = app
        .get("/api/notifications?unreadOnly=true", user)
        .await;
    assert_eq!(unread.body["data"].as_array().unwrap().len(), 2);

    let limited = app.get("/api/notifications?limit=1", user).await;
    assert_eq!(limited.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(limited.body["unreadCount"], 2);
}

#[tokio::test]
async fn mark_all_twice_changes_nothing_the_second_time() {
    let app = TestApp::new();
    let user = app.user();
    create(&app, user, user, "a").await;
    create(&app, user, user, "b").await;

    let first = mark_read(&app, user, json!({ "markAll": true })).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["data"]["updatedCount"], 2);
    assert_eq!(first.body["message"], "Notifications marked as read");

    let second = mark_read(&app, user, json!({ "markAll": true })).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["data"]["updatedCount"], 0);

    for n in app.store.notifications_for(user) {
        assert!(n.is_read);
        assert!(n.read_utc.is_some());
    }
}

#[tokio::test]
async fn mark_some_ignores_ids_owned_by_others() {
    let app = TestApp::new();
    let user = app.user();
    let other = app.user();
    let theirs = create(&app, other, other, "private").await;

    let their_id = theirs["notificationId"].clone();
    let res = mark_read(&app, user, json!({ "notificationIds": [their_id] })).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["updatedCount"], 0);
    assert!(!app.store.notifications_for(other)[0].is_read);
}

#[tokio::test]
async fn mark_read_requires_exactly_one_target() {
    let app = TestApp::new();
    let user = app.user();

    for body in [
        json!({}),
        json!({ "notificationIds": [] }),
        json!({ "markAll": false }),
    ] {
        let res = mark_read(&app, user, body).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body,
            json!({
                "success": false,
                "message": "Provide either a non-empty notificationIds array or markAll: true"
            })
        );
    }
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = TestApp::new();
    let user = app.user();

    let res = mark_read(&app, user, json!({ "notificationIds": ["not-a-uuid"] })).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
}
