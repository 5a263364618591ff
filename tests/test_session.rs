mod common;

use std::time::Duration;

use chrono::TimeDelta;
use reqwest::StatusCode;
use serde_json::Value;

use common::test_context::{COOKIE_NAME, TestContext, TestOptions};
use common::{csrf_token, error_message, login, login_as, open_session, removes_cookie};

#[tokio::test]
async fn session_endpoint_issues_cookie_and_token() {
    let ctx = TestContext::start(TestOptions::default()).await;

    let response = ctx.api.get("session").await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = csrf_token(&response).expect("no CSRF token issued");
    let body: Value = response.json().await.expect("invalid body");
    assert_eq!(body["authenticated"], Value::Bool(false));

    // The same session and token come back on the next visit.
    assert_eq!(open_session(&ctx.api).await, Some(token));
    assert_eq!(ctx.sessions.len().await, 1);
}

#[tokio::test]
async fn login_reports_profile_and_roles() {
    let ctx = TestContext::start(TestOptions::default()).await;
    let token = open_session(&ctx.api).await;

    let response = login(&ctx.api, "joe", "joesPassword", token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let new_token = csrf_token(&response);
    assert!(new_token.is_some());
    assert_ne!(new_token, token);

    let body: Value = response.json().await.expect("invalid body");
    assert_eq!(body["contributor"]["user_name"], "joe");
    assert_eq!(body["contributor"]["display_name"], "Joe User");
    assert_eq!(body["roles"], serde_json::json!(["contributors", "editor"]));

    let response = ctx.api.get("session").await;
    assert_eq!(csrf_token(&response), new_token);
    let body: Value = response.json().await.expect("invalid body");
    assert_eq!(body["authenticated"], Value::Bool(true));
    assert_eq!(body["identity"]["id"], ctx.joe.id.to_string());
    assert_eq!(ctx.sessions.len().await, 1);
}

#[tokio::test]
async fn login_without_a_session_needs_no_token() {
    let ctx = TestContext::start(TestOptions::default()).await;
    let response = login(&ctx.api, "joe", "joesPassword", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(csrf_token(&response).is_some());
}

#[tokio::test]
async fn forged_token_is_refused_before_the_directory_is_asked() {
    let ctx = TestContext::start(TestOptions::default()).await;
    open_session(&ctx.api).await;

    let response = login(&ctx.api, "joe", "joesPassword", Some("forged")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid CSRF token.");

    let response = login(&ctx.api, "joe", "joesPassword", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.directory.calls(), 0);
}

#[tokio::test]
async fn safe_methods_are_not_checked() {
    let ctx = TestContext::start(TestOptions::default()).await;
    login_as(&ctx.api, "joe").await;

    let response = ctx.api.get("contributors/joe").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn disabled_csrf_issues_no_tokens() {
    let ctx = TestContext::start(TestOptions {
        csrf: false,
        ..TestOptions::default()
    })
    .await;
    assert_eq!(open_session(&ctx.api).await, None);

    let response = login(&ctx.api, "joe", "joesPassword", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(csrf_token(&response), None);

    let response = ctx.api.delete("session", None).await;
    assert_eq!(response.status(), StatusCode::RESET_CONTENT);
}

#[tokio::test]
async fn failed_logins_look_alike_and_leave_the_session_anonymous() {
    let ctx = TestContext::start(TestOptions::default()).await;
    let token = open_session(&ctx.api).await;

    for (username, password) in [
        ("joe", "wrong"),
        ("nobody", "nobodysPassword"),
        ("ghost", "ghostsPassword"),
    ] {
        let response = login(&ctx.api, username, password, token.as_deref()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(response).await, "Authentication failed");
    }

    let body: Value = ctx
        .api
        .get("session")
        .await
        .json()
        .await
        .expect("invalid body");
    assert_eq!(body["authenticated"], Value::Bool(false));
    assert_eq!(ctx.sessions.len().await, 1);
}

#[tokio::test]
async fn failed_login_without_a_session_creates_none() {
    let ctx = TestContext::start(TestOptions::default()).await;
    let response = login(&ctx.api, "joe", "wrong", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.sessions.len().await, 0);
}

#[tokio::test]
async fn revived_sessions_do_not_consult_the_directory() {
    let ctx = TestContext::start(TestOptions::default()).await;
    let token = login_as(&ctx.api, "joe").await;
    assert_eq!(ctx.directory.calls(), 1);

    for _ in 0..3 {
        let response = ctx.api.get("contributors/joe").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = ctx.api.delete("session", token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::RESET_CONTENT);
    assert_eq!(ctx.directory.calls(), 1);
}

#[tokio::test]
async fn sessions_are_per_client() {
    let ctx = TestContext::start(TestOptions::default()).await;
    login_as(&ctx.api, "joe").await;

    let other = ctx.new_client();
    let body: Value = other
        .get("session")
        .await
        .json()
        .await
        .expect("invalid body");
    assert_eq!(body["authenticated"], Value::Bool(false));
}

#[tokio::test]
async fn logout_twice_succeeds() {
    let ctx = TestContext::start(TestOptions::default()).await;
    let token = login_as(&ctx.api, "joe").await;

    let response = ctx.api.delete("session", token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::RESET_CONTENT);
    let body: Value = ctx
        .api
        .get("session")
        .await
        .json()
        .await
        .expect("invalid body");
    assert_eq!(body["authenticated"], Value::Bool(false));

    // The anonymous session is now destroyed and its cookie dropped.
    let response = ctx.api.delete("session", token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::RESET_CONTENT);
    assert!(removes_cookie(&response, COOKIE_NAME));
    assert_eq!(ctx.sessions.len().await, 0);

    let response = ctx.api.delete("session", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn logout_requires_the_token() {
    let ctx = TestContext::start(TestOptions::default()).await;
    login_as(&ctx.api, "joe").await;

    let response = ctx.api.delete("session", Some("forged")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = ctx
        .api
        .get("session")
        .await
        .json()
        .await
        .expect("invalid body");
    assert_eq!(body["authenticated"], Value::Bool(true));
}

#[tokio::test]
async fn expired_session_cookie_is_dropped() {
    let ctx = TestContext::start(TestOptions {
        ttl: TimeDelta::seconds(1),
        ..TestOptions::default()
    })
    .await;
    login_as(&ctx.api, "joe").await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let response = ctx.api.get("contributors/joe").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(removes_cookie(&response, COOKIE_NAME));
    assert_eq!(ctx.backing_store.last_bound().as_deref(), Some("guest"));
}

async fn expired_login(ttl: TimeDelta) -> (TestContext, Option<String>) {
    let ctx = TestContext::start(TestOptions {
        ttl,
        ..TestOptions::default()
    })
    .await;
    let token = login_as(&ctx.api, "joe").await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    (ctx, token)
}

#[tokio::test]
async fn logout_after_expiry_succeeds_and_drops_the_cookie() {
    let (ctx, token) = expired_login(TimeDelta::seconds(1)).await;

    let response = ctx.api.delete("session", token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(removes_cookie(&response, COOKIE_NAME));

    let response = ctx.api.delete("session", token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn login_after_expiry_starts_a_new_session() {
    let (ctx, token) = expired_login(TimeDelta::seconds(1)).await;

    let response = login(&ctx.api, "joe", "joesPassword", token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fresh = csrf_token(&response).expect("no CSRF token after login");
    assert_ne!(Some(fresh.as_str()), token.as_deref());

    let response = ctx.api.get("session").await;
    let body: Value = response.json().await.expect("invalid body");
    assert_eq!(body["authenticated"], Value::Bool(true));
    assert_eq!(ctx.directory.calls(), 2);
}

#[tokio::test]
async fn login_after_expiry_needs_no_token() {
    let (ctx, _) = expired_login(TimeDelta::seconds(1)).await;

    let response = login(&ctx.api, "joe", "joesPassword", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(csrf_token(&response).is_some());
}

#[tokio::test]
async fn sessions_can_be_created_for_every_request() {
    let ctx = TestContext::start(TestOptions {
        create_unconditionally: true,
        ..TestOptions::default()
    })
    .await;

    let response = ctx.api.get("contributors/joe").await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = csrf_token(&response);
    assert!(token.is_some());
    assert_eq!(ctx.sessions.len().await, 1);

    // The cookie set above is now claimed, so the token is enforced.
    let response = login(&ctx.api, "joe", "joesPassword", token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.sessions.len().await, 1);
}
