//! # dbpulse-core
//!
//! HTTP engine for dbpulse: a hyper-based server with graceful shutdown and
//! upgrade support, a matchit router, typed extractors and response types.
//!
//! ```rust,ignore
//! use dbpulse_core::{get, App, Html};
//!
//! async fn index() -> Html<&'static str> {
//!     Html("<h1>hello</h1>")
//! }
//!
//! App::new().route("/", get(index)).run("127.0.0.1:8000").await?;
//! ```

mod app;
mod error;
mod extract;
mod handler;
mod request;
mod response;
mod router;
mod server;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

pub use app::App;
pub use error::{ApiError, Result};
pub use extract::{FromPathParams, FromRequest, FromRequestParts, Path, State};
pub use handler::{BoxFuture, Handler};
pub use request::{PathParams, Request};
pub use response::{Html, IntoResponse, Json, Response};
pub use router::{get, MethodRouter, RouteConflictError, Router};
pub use server::ServerError;
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestResponse};
