#![allow(dead_code)]

use reqwest::{Response, StatusCode, header::SET_COOKIE};
use serde_json::{Value, json};

use gatekeeper::auth::csrf::CSRF_HEADER;

use api_client::ApiClient;

pub mod api_client;
pub mod test_context;

pub fn csrf_token(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

/// Whether the response tells the client to drop cookie `name`.
pub fn removes_cookie(response: &Response, name: &str) -> bool {
    response.headers().get_all(SET_COOKIE).iter().any(|value| {
        value
            .to_str()
            .is_ok_and(|v| v.starts_with(&format!("{name}=")) && v.contains("Max-Age=0"))
    })
}

/// Establishes a session and returns its CSRF token.
pub async fn open_session(api: &ApiClient) -> Option<String> {
    let response = api.get("session").await;
    assert_eq!(response.status(), StatusCode::OK);
    csrf_token(&response)
}

pub async fn login(api: &ApiClient, username: &str, password: &str, csrf: Option<&str>) -> Response {
    api.post(
        "session",
        &json!({ "username": username, "password": password }),
        csrf,
    )
    .await
}

/// Logs in with a fresh session and returns the post-login CSRF token.
pub async fn login_as(api: &ApiClient, username: &str) -> Option<String> {
    let token = open_session(api).await;
    let response = login(api, username, &format!("{username}sPassword"), token.as_deref()).await;
    assert_eq!(response.status(), StatusCode::OK);
    csrf_token(&response)
}

pub async fn error_message(response: Response) -> String {
    let body: Value = response.json().await.expect("Error body is not JSON");
    body["error"]["message"]
        .as_str()
        .map(String::from)
        .unwrap_or_default()
}
