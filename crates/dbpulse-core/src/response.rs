//! Response types for dbpulse
//!
//! The core trait is [`IntoResponse`], which converts handler return values
//! into HTTP responses.
//!
//! | Type | Status | Content-Type |
//! |------|--------|--------------|
//! | `String` / `&str` | 200 | text/plain |
//! | `()` | 200 | - |
//! | [`Json<T>`] | 200 | application/json |
//! | [`Html<T>`] | 200 | text/html |
//! | [`ApiError`] | varies | application/json |

use crate::error::{ApiError, ErrorResponse};
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Trait for types that can be converted into an HTTP response
pub trait IntoResponse {
    /// Convert self into a Response
    fn into_response(self) -> Response;
}

fn build(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        build(StatusCode::OK, None, Bytes::new())
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        build(
            StatusCode::OK,
            Some("text/plain; charset=utf-8"),
            Bytes::from_static(self.as_bytes()),
        )
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        build(
            StatusCode::OK,
            Some("text/plain; charset=utf-8"),
            Bytes::from(self),
        )
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        build(self, None, Bytes::new())
    }
}

impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;
        response
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let error_response = ErrorResponse::from(self);
        let body = serde_json::to_vec(&error_response).unwrap_or_else(|_| {
            br#"{"error":{"type":"internal_error","message":"Failed to serialize error"}}"#
                .to_vec()
        });
        build(status, Some("application/json"), Bytes::from(body))
    }
}

/// Serializes the wrapped value as an `application/json` body
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => build(StatusCode::OK, Some("application/json"), Bytes::from(body)),
            Err(err) => ApiError::internal("Failed to serialize response")
                .with_internal(err.to_string())
                .into_response(),
        }
    }
}

/// HTML response wrapper
#[derive(Debug, Clone)]
pub struct Html<T>(pub T);

impl<T: Into<String>> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        build(
            StatusCode::OK,
            Some("text/html; charset=utf-8"),
            Bytes::from(self.0.into()),
        )
    }
}
