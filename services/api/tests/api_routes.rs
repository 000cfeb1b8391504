//! End-to-end tests through the full router, against the in-memory store.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use common::{harness, Harness};
use legacy_notes_core::domain::UserSettings;
use legacy_notes_core::ports::DatabaseService;
use legacy_notes_core::Status;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    app: Router,
    h: Harness,
}

impl TestApp {
    fn new() -> Self {
        let h = harness();
        let app = api_lib::web::router(h.state.clone()).expect("router builds");
        Self { app, h }
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value, Option<String>) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value, set_cookie)
    }

    /// Signs up a fresh account and returns its `session=...` cookie and id.
    async fn sign_up(&self) -> (String, Uuid) {
        let email = format!("{}@example.com", Uuid::new_v4());
        let (status, body, cookie) = self
            .call(
                "POST",
                "/auth/signup",
                None,
                Some(json!({ "email": email, "password": "correct horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let user_id = body["userId"].as_str().unwrap().parse().unwrap();
        (cookie.expect("signup sets a cookie"), user_id)
    }
}

fn example_note() -> Value {
    json!({ "title": "Hi", "recipientEmail": "a@b.com", "content": "hello" })
}

#[tokio::test]
async fn health_is_public() {
    let t = TestApp::new();
    let (status, body, _) = t.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_a_session() {
    let t = TestApp::new();
    let (status, _, _) = t.call("GET", "/api/notes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = t
        .call("GET", "/api/settings", Some("session=bogus"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_and_logout() {
    let t = TestApp::new();
    let (status, _, _) = t
        .call(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "Owner@Example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = t
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "owner@example.com", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, cookie) = t
        .call(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "owner@example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.unwrap();

    let (status, _, _) = t.call("GET", "/api/notes", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = t.call("POST", "/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = t.call("GET", "/api/notes", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_note_returns_unreleased_note_with_id() {
    let t = TestApp::new();
    let (cookie, user_id) = t.sign_up().await;

    let (status, note, _) = t
        .call("POST", "/api/notes", Some(&cookie), Some(example_note()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["isReleased"], false);
    assert_eq!(note["title"], "Hi");
    assert_eq!(note["folder"], "General");
    assert_eq!(note["userId"], user_id.to_string());
    assert!(note["id"].as_str().unwrap().parse::<Uuid>().is_ok());

    let (status, list, _) = t.call("GET", "/api/notes", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], note["id"]);
}

#[tokio::test]
async fn create_note_without_recipient_is_rejected() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;

    let (status, body, _) = t
        .call(
            "POST",
            "/api/notes",
            Some(&cookie),
            Some(json!({ "title": "Hi", "content": "hello", "recipientEmail": "", "recipientPhone": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Either recipient email or phone number must be provided"
    );

    let (_, list, _) = t.call("GET", "/api/notes", Some(&cookie), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;

    let (status, body, _) = t
        .call(
            "POST",
            "/api/notes",
            Some(&cookie),
            Some(json!({ "recipientEmail": "a@b.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn malformed_note_id_is_a_json_bad_request() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;

    let (status, body, _) = t
        .call("DELETE", "/api/notes/not-a-uuid", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, body, _) = t
        .call(
            "POST",
            "/api/released/not-a-uuid/unlock",
            None,
            Some(json!({ "accessCode": "maple" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn unroutable_phone_numbers_are_rejected() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;

    let (status, body, _) = t
        .call(
            "POST",
            "/api/notes",
            Some(&cookie),
            Some(json!({
                "title": "Hi",
                "content": "hello",
                "recipientEmail": "kid@example.com",
                "recipientPhone": "not a phone"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid phone number");

    let (status, _, _) = t
        .call(
            "PATCH",
            "/api/settings",
            Some(&cookie),
            Some(json!({ "notificationPhone": "call me" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn strangers_cannot_update_or_delete() {
    let t = TestApp::new();
    let (owner, _) = t.sign_up().await;
    let (stranger, _) = t.sign_up().await;

    let (_, note, _) = t
        .call("POST", "/api/notes", Some(&owner), Some(example_note()))
        .await;
    let uri = format!("/api/notes/{}", note["id"].as_str().unwrap());

    let (status, _, _) = t
        .call("PATCH", &uri, Some(&stranger), Some(json!({ "title": "Mine now" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = t.call("DELETE", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list, _) = t.call("GET", "/api/notes", Some(&owner), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["title"], "Hi");
    assert_eq!(list[0]["lastEdited"], note["lastEdited"]);
}

#[tokio::test]
async fn update_is_partial_and_keeps_a_recipient() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;
    let (_, note, _) = t
        .call("POST", "/api/notes", Some(&cookie), Some(example_note()))
        .await;
    let uri = format!("/api/notes/{}", note["id"].as_str().unwrap());

    let (status, updated, _) = t
        .call(
            "PATCH",
            &uri,
            Some(&cookie),
            Some(json!({ "content": "goodbye", "folder": "Family" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Hi");
    assert_eq!(updated["content"], "goodbye");
    assert_eq!(updated["folder"], "Family");
    assert_eq!(updated["recipientEmail"], "a@b.com");
    assert_eq!(updated["createdAt"], note["createdAt"]);

    let (status, _, _) = t
        .call("PATCH", &uri, Some(&cookie), Some(json!({ "recipientEmail": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list, _) = t.call("GET", "/api/notes", Some(&cookie), None).await;
    assert_eq!(list[0]["recipientEmail"], "a@b.com");
}

#[tokio::test]
async fn delete_removes_the_note() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;
    let (_, note, _) = t
        .call("POST", "/api/notes", Some(&cookie), Some(example_note()))
        .await;
    let uri = format!("/api/notes/{}", note["id"].as_str().unwrap());

    let (status, _, _) = t.call("DELETE", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = t.call("DELETE", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list, _) = t.call("GET", "/api/notes", Some(&cookie), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn settings_are_created_lazily_and_updated_partially() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;

    let (status, settings, _) = t.call("GET", "/api/settings", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["checkInFrequencyDays"], 30);
    assert_eq!(settings["releaseDelayDays"], 7);
    assert_eq!(settings["status"], "active");
    assert_eq!(settings["isVacationMode"], false);

    let (status, updated, _) = t
        .call(
            "PATCH",
            "/api/settings",
            Some(&cookie),
            Some(json!({ "releaseDelayDays": 14, "notificationPhone": "+15551234567" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["releaseDelayDays"], 14);
    assert_eq!(updated["checkInFrequencyDays"], 30);
    assert_eq!(updated["notificationPhone"], "+15551234567");
    assert_eq!(updated["lastCheckIn"], settings["lastCheckIn"]);

    let (status, _, _) = t
        .call(
            "PATCH",
            "/api/settings",
            Some(&cookie),
            Some(json!({ "checkInFrequencyDays": 400 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, current, _) = t.call("GET", "/api/settings", Some(&cookie), None).await;
    assert_eq!(current["checkInFrequencyDays"], 30);
}

#[tokio::test]
async fn check_in_resets_a_released_user() {
    let t = TestApp::new();
    let (cookie, user_id) = t.sign_up().await;

    let long_ago = Utc::now() - Duration::days(90);
    t.h.db
        .update_settings_with(user_id, long_ago, &|settings: &mut UserSettings| {
            settings.status = Status::Released
        })
        .await
        .unwrap();

    let before = Utc::now();
    let (status, body, _) = t.call("POST", "/api/check-in", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let last: DateTime<Utc> = body["lastCheckIn"].as_str().unwrap().parse().unwrap();
    assert!(last >= before);
}

#[tokio::test]
async fn test_reminder_needs_a_phone() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;

    let (status, _, _) = t
        .call("POST", "/api/settings/test-reminder", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(t.h.sms.sent().is_empty());

    t.call(
        "PATCH",
        "/api/settings",
        Some(&cookie),
        Some(json!({ "notificationPhone": "+15551234567" })),
    )
    .await;

    let (status, body, _) = t
        .call("POST", "/api/settings/test-reminder", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Test reminder sent");

    let sent = t.h.sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+15551234567");
}

#[tokio::test]
async fn test_reminder_surfaces_provider_failure() {
    let t = TestApp::new();
    let (cookie, _) = t.sign_up().await;
    t.call(
        "PATCH",
        "/api/settings",
        Some(&cookie),
        Some(json!({ "notificationPhone": "+15551234567" })),
    )
    .await;
    t.h.sms.set_failing(true);

    let (status, _, _) = t
        .call("POST", "/api/settings/test-reminder", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn upload_url_is_scoped_to_the_user() {
    let t = TestApp::new();
    let (cookie, user_id) = t.sign_up().await;

    let (status, body, _) = t
        .call(
            "POST",
            "/api/uploads/request-url",
            Some(&cookie),
            Some(json!({ "name": "photo.jpg", "contentType": "image/jpeg" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "PUT");
    assert_eq!(body["headers"]["Content-Type"], "image/jpeg");
    let path = body["objectPath"].as_str().unwrap();
    assert!(path.starts_with(&format!("/objects/uploads/{}/", user_id)));
    assert!(body["url"].as_str().unwrap().contains("signature="));
}
