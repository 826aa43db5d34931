//! Extractors for dbpulse
//!
//! Extractors pull typed data out of incoming requests before a handler runs:
//! [`Path`] for captured route parameters and [`State`] for shared state.

use crate::error::{ApiError, Result};
use crate::request::{PathParams, Request};
use std::future::Future;
use std::ops::Deref;
use std::str::FromStr;

/// Trait for extracting data from request parts (headers, path, state)
pub trait FromRequestParts: Sized {
    /// Extract from request parts
    fn from_request_parts(req: &Request) -> Result<Self>;
}

/// Trait for extracting data from the full request (including body and extensions)
pub trait FromRequest: Sized {
    /// Extract from the full request
    fn from_request(req: &mut Request) -> impl Future<Output = Result<Self>> + Send;
}

impl<T: FromRequestParts> FromRequest for T {
    async fn from_request(req: &mut Request) -> Result<Self> {
        T::from_request_parts(req)
    }
}

/// Values that can be parsed out of captured path parameters.
///
/// Implemented for common scalars (first parameter) and for pairs and
/// triples (parameters in route order).
pub trait FromPathParams: Sized {
    /// Parse from the captured parameters
    fn from_path_params(params: &PathParams) -> Result<Self>;
}

fn parse_param<T>(params: &PathParams, index: usize) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = params
        .values()
        .nth(index)
        .ok_or_else(|| ApiError::internal("Missing path parameter"))?;
    raw.parse::<T>()
        .map_err(|e| ApiError::bad_request(format!("Invalid path parameter `{}`: {}", raw, e)))
}

macro_rules! impl_from_path_params_for_scalars {
    ($($ty:ty),*) => {
        $(
            impl FromPathParams for $ty {
                fn from_path_params(params: &PathParams) -> Result<Self> {
                    parse_param(params, 0)
                }
            }
        )*
    };
}

impl_from_path_params_for_scalars!(i32, i64, u32, u64, usize, bool, String);

impl<A, B> FromPathParams for (A, B)
where
    A: FromStr,
    A::Err: std::fmt::Display,
    B: FromStr,
    B::Err: std::fmt::Display,
{
    fn from_path_params(params: &PathParams) -> Result<Self> {
        Ok((parse_param(params, 0)?, parse_param(params, 1)?))
    }
}

impl<A, B, C> FromPathParams for (A, B, C)
where
    A: FromStr,
    A::Err: std::fmt::Display,
    B: FromStr,
    B::Err: std::fmt::Display,
    C: FromStr,
    C::Err: std::fmt::Display,
{
    fn from_path_params(params: &PathParams) -> Result<Self> {
        Ok((
            parse_param(params, 0)?,
            parse_param(params, 1)?,
            parse_param(params, 2)?,
        ))
    }
}

/// Path parameter extractor
///
/// For route `/update/{id}/{value}`:
///
/// ```rust,ignore
/// async fn update(Path((id, value)): Path<(i64, String)>) -> impl IntoResponse {
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Path<T>(pub T);

impl<T: FromPathParams> FromRequestParts for Path<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        T::from_path_params(req.path_params()).map(Path)
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// State extractor
///
/// Extracts shared application state registered with `App::state`.
#[derive(Debug, Clone)]
pub struct State<T>(pub T);

impl<T: Clone + Send + Sync + 'static> FromRequestParts for State<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        req.state().get::<T>().cloned().map(State).ok_or_else(|| {
            ApiError::internal(format!(
                "State of type `{}` not found. Did you forget to call .state()?",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl<T> Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
