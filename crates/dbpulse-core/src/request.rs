//! Request types for dbpulse

use http::{request::Parts, Extensions, HeaderMap, Method};
use std::sync::Arc;

/// Path parameters captured by the router, in route declaration order.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a captured parameter
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.push((key.into(), value.into()));
    }

    /// Get a value by name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of captured parameters
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no parameters were captured
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Captured values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(_, v)| v.as_str())
    }
}

/// HTTP Request wrapper
///
/// Provides access to all parts of an incoming HTTP request.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) state: Arc<Extensions>,
    pub(crate) path_params: PathParams,
}

impl Request {
    pub(crate) fn new(parts: Parts, state: Arc<Extensions>, path_params: PathParams) -> Self {
        Self {
            parts,
            state,
            path_params,
        }
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get mutable extensions
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Get path parameters
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Get shared state
    pub fn state(&self) -> &Arc<Extensions> {
        &self.state
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .finish()
    }
}
