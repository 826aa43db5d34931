//! The HTTP side of the WebSocket handshake

use crate::{WebSocketError, WebSocketStream, WsHeartbeatConfig};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use dbpulse_core::IntoResponse;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use sha1::{Digest, Sha1};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, error, warn};

/// RFC 6455 handshake GUID
const WS_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

type ConnectionTask =
    Box<dyn FnOnce(WebSocketStream) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// The `101 Switching Protocols` reply to a validated upgrade request
///
/// Returned from handlers. Once hyper hands over the upgraded connection the
/// task given to [`on_upgrade`](Self::on_upgrade) runs with the stream.
pub struct WebSocketUpgrade {
    accept: String,
    pending: Option<OnUpgrade>,
    task: Option<ConnectionTask>,
    heartbeat: Option<WsHeartbeatConfig>,
}

impl WebSocketUpgrade {
    pub(crate) fn new(sec_key: &str, pending: Option<OnUpgrade>) -> Self {
        Self {
            accept: accept_key(sec_key),
            pending,
            task: None,
            heartbeat: None,
        }
    }

    /// Hand the connection to a heartbeat-managed stream
    pub fn heartbeat(self, config: WsHeartbeatConfig) -> Self {
        Self {
            heartbeat: Some(config),
            ..self
        }
    }

    /// Task that owns the connection once the upgrade completes
    pub fn on_upgrade<F, Fut>(mut self, task: F) -> Self
    where
        F: FnOnce(WebSocketStream) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.task = Some(Box::new(move |stream| Box::pin(task(stream))));
        self
    }

    fn switching_protocols(&self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
        let headers = response.headers_mut();
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
        // base64 output is always a valid header value
        if let Ok(accept) = HeaderValue::from_str(&self.accept) {
            headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);
        }
        response
    }
}

impl IntoResponse for WebSocketUpgrade {
    fn into_response(mut self) -> Response<Full<Bytes>> {
        let response = self.switching_protocols();

        let (Some(pending), Some(task)) = (self.pending.take(), self.task.take()) else {
            warn!("Upgrade response produced without an upgradable connection or a task");
            return response;
        };
        let heartbeat = self.heartbeat;

        tokio::spawn(async move {
            match pending.await {
                Ok(upgraded) => {
                    debug!(heartbeat = heartbeat.is_some(), "WebSocket established");
                    let stream =
                        WebSocketStream::from_raw_socket(TokioIo::new(upgraded), heartbeat).await;
                    task(stream).await;
                }
                Err(err) => error!(error = %err, "WebSocket upgrade failed"),
            }
        });

        response
    }
}

/// `Sec-WebSocket-Accept` for a client's `Sec-WebSocket-Key`
fn accept_key(sec_key: &str) -> String {
    let digest = Sha1::new()
        .chain_update(sec_key.as_bytes())
        .chain_update(WS_GUID)
        .finalize();
    BASE64.encode(digest)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Result<&'a str, WebSocketError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebSocketError::invalid_upgrade(format!("Missing {} header", name)))
}

/// Comma-separated header values compare case-insensitively per token
fn lists_token(value: &str, token: &str) -> bool {
    value.split(',').any(|t| t.trim().eq_ignore_ascii_case(token))
}

/// Check that a request asks for a version 13 WebSocket, returning its key
pub(crate) fn validate_upgrade_request(
    method: &Method,
    headers: &HeaderMap,
) -> Result<String, WebSocketError> {
    if method != Method::GET {
        return Err(WebSocketError::invalid_upgrade("Method must be GET"));
    }
    if !lists_token(header_str(headers, &header::UPGRADE)?, "websocket") {
        return Err(WebSocketError::invalid_upgrade("Upgrade header must be 'websocket'"));
    }
    if !lists_token(header_str(headers, &header::CONNECTION)?, "upgrade") {
        return Err(WebSocketError::invalid_upgrade(
            "Connection header must contain 'Upgrade'",
        ));
    }
    if header_str(headers, &header::SEC_WEBSOCKET_VERSION)?.trim() != "13" {
        return Err(WebSocketError::invalid_upgrade("Sec-WebSocket-Version must be 13"));
    }

    let key = header_str(headers, &header::SEC_WEBSOCKET_KEY)?.trim();
    // a 16-byte nonce, base64 encoded
    match BASE64.decode(key) {
        Ok(nonce) if nonce.len() == 16 => Ok(key.to_string()),
        _ => Err(WebSocketError::invalid_upgrade("Malformed Sec-WebSocket-Key")),
    }
}
