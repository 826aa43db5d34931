//! Application builder

use crate::router::{MethodRouter, Router};
use crate::server::{Server, ServerError};
use std::future::Future;
use tokio::net::TcpListener;

/// Main application builder
///
/// # Example
///
/// ```rust,ignore
/// App::new()
///     .state(state)
///     .route("/", get(index))
///     .route("/ws", get(live_updates))
///     .run("127.0.0.1:8000")
///     .await
/// ```
pub struct App {
    router: Router,
}

impl App {
    /// Create a new application with no routes
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add shared state, retrievable in handlers with `State<S>`
    pub fn state<S: Clone + Send + Sync + 'static>(mut self, state: S) -> Self {
        self.router = self.router.state(state);
        self
    }

    /// Register a route
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Consume the app and return its router
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until the process is stopped
    pub async fn run(self, addr: &str) -> Result<(), ServerError> {
        self.run_with_shutdown(addr, std::future::pending()).await
    }

    /// Run the server until `shutdown` resolves
    pub async fn run_with_shutdown<F>(self, addr: &str, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        Server::new(self.router).run(addr, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        Server::new(self.router).serve(listener, shutdown).await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
