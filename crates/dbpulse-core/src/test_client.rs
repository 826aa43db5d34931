//! In-process test client
//!
//! Sends simulated requests through the router and handlers without binding
//! a socket.
//!
//! ```rust,ignore
//! let client = TestClient::new(App::new().route("/", get(index)));
//! let response = client.get("/").await;
//! response.assert_status(StatusCode::OK);
//! ```

use crate::app::App;
use crate::router::Router;
use crate::server::dispatch;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Test client for integration testing without network binding
pub struct TestClient {
    router: Arc<Router>,
}

impl TestClient {
    /// Create a new test client from an app
    pub fn new(app: App) -> Self {
        Self {
            router: Arc::new(app.into_router()),
        }
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path).await
    }

    /// Send a request with an arbitrary method
    pub async fn request(&self, method: Method, path: &str) -> TestResponse {
        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(path)
            .body(())
            .expect("test request should be valid")
            .into_parts();

        let response = dispatch(&self.router, parts).await;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .unwrap_or_default();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Response captured by [`TestClient`]
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Response status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("response body should be valid JSON")
    }

    /// Assert the response status
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "unexpected status, body: {}",
            self.text()
        );
        self
    }
}
