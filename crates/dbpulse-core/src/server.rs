//! HTTP server implementation

use crate::error::ApiError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::{RouteMatch, Router};
use http::{header, HeaderValue, StatusCode};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Errors that stop the server from running
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The bind address could not be parsed
    #[error("invalid bind address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
    /// Binding or accepting on the listener failed
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Internal server struct
pub(crate) struct Server {
    router: Arc<Router>,
}

impl Server {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    /// Bind `addr` and serve until `shutdown` resolves
    pub async fn run<F>(self, addr: &str, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let parsed: SocketAddr = addr.parse().map_err(|source| ServerError::InvalidAddr {
            addr: addr.to_string(),
            source,
        })?;
        let listener = TcpListener::bind(parsed).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        info!("dbpulse server running on http://{}", local_addr);

        tokio::pin!(shutdown);

        loop {
            let (stream, remote_addr) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        // accept errors (e.g. EMFILE) are per-connection
                        warn!("Accept error: {}", err);
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<Incoming>| {
                    let router = router.clone();
                    async move {
                        let response = handle_request(router, req, remote_addr).await;
                        Ok::<_, Infallible>(response)
                    }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .with_upgrades()
                    .await
                {
                    debug!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }
}

/// Handle a single HTTP request
async fn handle_request(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = std::time::Instant::now();

    // every route is a GET; request bodies are never read
    let (parts, _body) = req.into_parts();

    let response = dispatch(&router, parts).await;
    log_request(&method, &path, response.status(), start, remote_addr);
    response
}

/// Route a request and run its handler
pub(crate) async fn dispatch(router: &Router, parts: http::request::Parts) -> Response {
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let (handler, params) = match router.match_route(&path, &method) {
        RouteMatch::Found { handler, params } => (handler.clone(), params),
        RouteMatch::NotFound => {
            return ApiError::not_found(format!("No route found for {} {}", method, path))
                .into_response();
        }
        RouteMatch::MethodNotAllowed { allowed } => {
            let allowed_str: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
            let mut response =
                ApiError::method_not_allowed(format!("Method {} not allowed for {}", method, path))
                    .into_response();
            if let Ok(value) = HeaderValue::from_str(&allowed_str.join(", ")) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            return response;
        }
    };

    let request = Request::new(parts, router.state_ref(), params);
    handler(request).await
}

/// Log request completion
fn log_request(
    method: &http::Method,
    path: &str,
    status: StatusCode,
    start: std::time::Instant,
    remote_addr: SocketAddr,
) {
    let elapsed = start.elapsed();

    if status.is_success() || status == StatusCode::SWITCHING_PROTOCOLS {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            remote = %remote_addr,
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            remote = %remote_addr,
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    }
}
