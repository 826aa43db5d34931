//! Router implementation using radix tree (matchit)
//!
//! Routes support dynamic path parameters using `{param}` syntax:
//!
//! - `/` - Static path
//! - `/update/{id}/{value}` - Two parameters, extracted in order
//!
//! ```rust,ignore
//! let router = Router::new()
//!     .route("/", get(index))
//!     .route("/add/{name}/{value}", get(add_record));
//! ```

use crate::handler::{into_boxed_handler, BoxedHandler, Handler};
use crate::request::PathParams;
use http::{Extensions, Method};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::sync::Arc;

/// Error returned when a route conflicts with an already registered one
#[derive(Debug, Clone, thiserror::Error)]
#[error("route `{new_path}` conflicts with `{existing_path}`: {details}")]
pub struct RouteConflictError {
    /// The path that was being registered
    pub new_path: String,
    /// The existing path that conflicts
    pub existing_path: String,
    /// Detailed error message from the underlying router
    pub details: String,
}

/// HTTP method router for a single path
#[derive(Clone, Default)]
pub struct MethodRouter {
    handlers: HashMap<Method, BoxedHandler>,
}

impl MethodRouter {
    /// Create a new empty method router
    pub fn new() -> Self {
        Self::default()
    }

    fn on<H, T>(mut self, method: Method, handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.handlers.insert(method, into_boxed_handler(handler));
        self
    }

    /// Add a GET handler
    pub fn get<H, T>(self, handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.on(Method::GET, handler)
    }

    fn get_handler(&self, method: &Method) -> Option<&BoxedHandler> {
        self.handlers.get(method)
    }

    fn allowed_methods(&self) -> Vec<Method> {
        self.handlers.keys().cloned().collect()
    }
}

/// Create a GET route handler
pub fn get<H, T>(handler: H) -> MethodRouter
where
    H: Handler<T>,
    T: 'static,
{
    MethodRouter::new().get(handler)
}

/// Result of matching a request against the router
pub(crate) enum RouteMatch<'a> {
    Found {
        handler: &'a BoxedHandler,
        params: PathParams,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
}

/// Main router
pub struct Router {
    inner: MatchitRouter<MethodRouter>,
    state: Arc<Extensions>,
    registered: HashMap<String, String>,
}

impl Router {
    /// Create a new router
    pub fn new() -> Self {
        Self {
            inner: MatchitRouter::new(),
            state: Arc::new(Extensions::new()),
            registered: HashMap::new(),
        }
    }

    /// Register a route, returning an error if it conflicts with an existing one
    pub fn try_route(
        mut self,
        path: &str,
        method_router: MethodRouter,
    ) -> Result<Self, RouteConflictError> {
        let matchit_path = convert_path_params(path);
        let normalized = normalize_path_for_comparison(&matchit_path);

        if let Err(e) = self.inner.insert(matchit_path, method_router) {
            let existing_path = self
                .registered
                .get(&normalized)
                .cloned()
                .unwrap_or_else(|| "<unknown>".to_string());
            return Err(RouteConflictError {
                new_path: path.to_string(),
                existing_path,
                details: e.to_string(),
            });
        }

        self.registered.insert(normalized, path.to_string());
        Ok(self)
    }

    /// Register a route
    ///
    /// # Panics
    ///
    /// Panics when the route conflicts with one already registered; routes
    /// are fixed at startup so a conflict is a programming error.
    pub fn route(self, path: &str, method_router: MethodRouter) -> Self {
        match self.try_route(path, method_router) {
            Ok(router) => router,
            Err(conflict) => panic!("{}", conflict),
        }
    }

    /// Add application state
    pub fn state<S: Clone + Send + Sync + 'static>(mut self, state: S) -> Self {
        Arc::make_mut(&mut self.state).insert(state);
        self
    }

    pub(crate) fn state_ref(&self) -> Arc<Extensions> {
        self.state.clone()
    }

    pub(crate) fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_> {
        match self.inner.at(path) {
            Ok(matched) => {
                let method_router = matched.value;

                if let Some(handler) = method_router.get_handler(method) {
                    let mut params = PathParams::new();
                    for (key, value) in matched.params.iter() {
                        // segments arrive still percent-encoded
                        match urlencoding::decode(value) {
                            Ok(decoded) => params.insert(key, decoded.into_owned()),
                            Err(_) => params.insert(key, value),
                        }
                    }
                    RouteMatch::Found { handler, params }
                } else {
                    RouteMatch::MethodNotAllowed {
                        allowed: method_router.allowed_methods(),
                    }
                }
            }
            Err(_) => RouteMatch::NotFound,
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert `{param}` style to matchit's `:param`
fn convert_path_params(path: &str) -> String {
    path.chars()
        .filter(|ch| *ch != '}')
        .map(|ch| if ch == '{' { ':' } else { ch })
        .collect()
}

/// Replace parameter names with a placeholder so `/a/:x` and `/a/:y` compare equal
fn normalize_path_for_comparison(path: &str) -> String {
    path.split('/')
        .map(|segment| if segment.starts_with(':') { ":" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok() -> &'static str {
        "ok"
    }

    #[test]
    fn braces_become_matchit_params() {
        assert_eq!(convert_path_params("/update/{id}/{value}"), "/update/:id/:value");
        assert_eq!(convert_path_params("/ws"), "/ws");
    }

    #[test]
    fn params_are_captured_in_order() {
        let router = Router::new().route("/update/{id}/{value}", get(ok));
        match router.match_route("/update/3/blue", &Method::GET) {
            RouteMatch::Found { params, .. } => {
                assert_eq!(params.values().collect::<Vec<_>>(), vec!["3", "blue"]);
                assert_eq!(params.get("value"), Some("blue"));
            }
            _ => panic!("route should match"),
        }
    }

    #[test]
    fn params_are_percent_decoded() {
        let router = Router::new().route("/add/{name}/{value}", get(ok));
        match router.match_route("/add/big%20box/it%27s", &Method::GET) {
            RouteMatch::Found { params, .. } => {
                assert_eq!(params.get("name"), Some("big box"));
                assert_eq!(params.get("value"), Some("it's"));
            }
            _ => panic!("route should match"),
        }
    }

    #[test]
    fn wrong_method_reports_allowed() {
        let router = Router::new().route("/", get(ok));
        match router.match_route("/", &Method::POST) {
            RouteMatch::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::GET]),
            _ => panic!("expected method not allowed"),
        }
    }

    #[test]
    fn conflicting_param_names_are_rejected() {
        let router = Router::new().route("/records/{id}", get(ok));
        let err = router
            .try_route("/records/{record_id}", get(ok))
            .err()
            .unwrap();
        assert_eq!(err.existing_path, "/records/{id}");
    }

    #[test]
    fn unknown_path_is_not_found() {
        let router = Router::new().route("/", get(ok));
        assert!(matches!(
            router.match_route("/nope", &Method::GET),
            RouteMatch::NotFound
        ));
    }
}
