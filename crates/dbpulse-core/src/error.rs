//! Error types for dbpulse HTTP handlers

use http::StatusCode;
use serde::Serialize;
use std::fmt;

macro_rules! status_constructors {
    ($($(#[$doc:meta])* $name:ident => $status:ident, $kind:literal;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(StatusCode::$status, $kind, message)
            }
        )*
    };
}

/// Result type alias for handler operations
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Standard API error type
///
/// Renders as a JSON body of the form
/// `{"error": {"type": "...", "message": "..."}}` with the carried status.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Error type identifier
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Internal details, logged but never rendered
    pub(crate) internal: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(
        status: StatusCode,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            error_type: error_type.into(),
            message: message.into(),
            internal: None,
        }
    }

    status_constructors! {
        /// 400 for malformed input such as an unparsable path segment
        bad_request => BAD_REQUEST, "bad_request";
        /// 404 for unknown routes and missing records
        not_found => NOT_FOUND, "not_found";
        /// 405 when the path exists under other methods
        method_not_allowed => METHOD_NOT_ALLOWED, "method_not_allowed";
        /// 500 for failures that are the server's fault
        internal => INTERNAL_SERVER_ERROR, "internal_error";
        /// 503 when a backing service (the record store) cannot be reached
        service_unavailable => SERVICE_UNAVAILABLE, "service_unavailable";
    }

    /// Add internal details (logged, hidden from the response body)
    pub fn with_internal(mut self, details: impl Into<String>) -> Self {
        self.internal = Some(details.into());
        self
    }

    /// Internal details attached with [`ApiError::with_internal`]
    pub fn internal_details(&self) -> Option<&str> {
        self.internal.as_deref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Wire shape of an error: `{"error": {"type", "message"}}`
#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        // the status line and body go to the client; the detail only to the log
        if let Some(details) = &err.internal {
            tracing::debug!(
                status = err.status.as_u16(),
                error_type = %err.error_type,
                details = %details,
                "Error detail withheld from response"
            );
        }
        Self {
            error: ErrorBody {
                kind: err.error_type,
                message: err.message,
            },
        }
    }
}
