use crate::upgrade::{validate_upgrade_request, WebSocketUpgrade};
use crate::WebSocketStream;
use dbpulse_core::{ApiError, FromRequest, Request, Result};
use hyper::upgrade::OnUpgrade;
use std::future::Future;

/// Handler argument for a WebSocket endpoint
///
/// Extraction fails with `400 Bad Request` unless the request is a valid
/// upgrade; plain `GET`s to the endpoint never reach the handler body.
///
/// ```rust,ignore
/// async fn live(ws: WebSocket) -> WebSocketUpgrade {
///     ws.on_upgrade(|stream| async move {
///         let (sender, mut receiver) = stream.split();
///         // register sender, then drain receiver until the client leaves
///     })
/// }
/// ```
pub struct WebSocket {
    key: String,
    pending: Option<OnUpgrade>,
}

impl WebSocket {
    /// Accept the upgrade; `task` owns the stream once it is established
    pub fn on_upgrade<F, Fut>(self, task: F) -> WebSocketUpgrade
    where
        F: FnOnce(WebSocketStream) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        WebSocketUpgrade::new(&self.key, self.pending).on_upgrade(task)
    }
}

impl FromRequest for WebSocket {
    async fn from_request(req: &mut Request) -> Result<Self> {
        let key = validate_upgrade_request(req.method(), req.headers()).map_err(ApiError::from)?;
        // absent when the request did not come through a live hyper connection
        let pending = req.extensions_mut().remove::<OnUpgrade>();
        Ok(Self { key, pending })
    }
}
