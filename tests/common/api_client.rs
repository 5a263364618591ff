use std::str::FromStr;

use reqwest::{Response, Url, header};
use serde::Serialize;

use gatekeeper::auth::csrf::CSRF_HEADER;

/// A browser-like client: keeps cookies between requests.
pub struct ApiClient {
    url: String,
    pub client: reqwest::Client,
}

impl ApiClient {
    pub fn new(url: impl Into<String>) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "content-type",
            header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .expect("Failed to build reqwest Client");
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn path(&self, endpoint: &str) -> Url {
        Url::from_str(&format!("{}/{endpoint}", self.url)).expect("Invalid endpoint")
    }

    pub async fn get(&self, endpoint: &str) -> Response {
        self.client
            .get(self.path(endpoint))
            .send()
            .await
            .expect("Failed to send get request")
    }

    pub async fn post<T: Serialize>(&self, endpoint: &str, body: &T, csrf: Option<&str>) -> Response {
        let mut request = self.client.post(self.path(endpoint)).json(body);
        if let Some(token) = csrf {
            request = request.header(CSRF_HEADER, token);
        }
        request.send().await.expect("Failed to send post request")
    }

    pub async fn delete(&self, endpoint: &str, csrf: Option<&str>) -> Response {
        let mut request = self.client.delete(self.path(endpoint));
        if let Some(token) = csrf {
            request = request.header(CSRF_HEADER, token);
        }
        request.send().await.expect("Failed to send delete request")
    }
}
