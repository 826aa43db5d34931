//! Handler trait and utilities

use crate::extract::FromRequest;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by type-erased handlers
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Type-erased handler stored in the router
pub(crate) type BoxedHandler = Arc<dyn Fn(Request) -> BoxFuture + Send + Sync>;

/// Trait representing an async handler function
///
/// Implemented for async functions taking up to three extractors.
pub trait Handler<T>: Clone + Send + Sync + Sized + 'static {
    /// Call the handler with the request
    fn call(self, req: Request) -> BoxFuture;
}

impl<F, Fut, Res> Handler<()> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Res> + Send + 'static,
    Res: IntoResponse,
{
    fn call(self, _req: Request) -> BoxFuture {
        Box::pin(async move { self().await.into_response() })
    }
}

macro_rules! impl_handler {
    ($($ty:ident),+) => {
        #[allow(non_snake_case)]
        impl<F, Fut, Res, $($ty,)+> Handler<($($ty,)+)> for F
        where
            F: FnOnce($($ty,)+) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoResponse,
            $($ty: FromRequest + Send + 'static,)+
        {
            fn call(self, mut req: Request) -> BoxFuture {
                Box::pin(async move {
                    $(
                        let $ty = match $ty::from_request(&mut req).await {
                            Ok(v) => v,
                            Err(e) => return e.into_response(),
                        };
                    )+
                    self($($ty,)+).await.into_response()
                })
            }
        }
    };
}

impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);

pub(crate) fn into_boxed_handler<H, T>(handler: H) -> BoxedHandler
where
    H: Handler<T>,
    T: 'static,
{
    Arc::new(move |req| handler.clone().call(req))
}
