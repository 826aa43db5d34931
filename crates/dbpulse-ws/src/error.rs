//! WebSocket error types

use thiserror::Error;

/// Error type for WebSocket operations
#[derive(Error, Debug)]
pub enum WebSocketError {
    /// Invalid WebSocket upgrade request
    #[error("Invalid WebSocket upgrade request: {0}")]
    InvalidUpgrade(String),

    /// Connection closed, either by the peer or by the heartbeat task
    #[error("Connection closed")]
    ConnectionClosed,

    /// The client stopped reading and its outbound queue is full
    #[error("Outbound queue full")]
    QueueFull,

    /// Tungstenite error
    #[error("WebSocket error: {0}")]
    Tungstenite(#[from] tungstenite::Error),
}

impl WebSocketError {
    /// Create an invalid upgrade error
    pub fn invalid_upgrade(msg: impl Into<String>) -> Self {
        Self::InvalidUpgrade(msg.into())
    }

    /// Whether this error means the peer can no longer be reached.
    ///
    /// Delivery failures retire the connection. Anything else (an oversized
    /// frame, a handshake problem) points at the message or at our own code
    /// and is reported instead.
    pub fn is_delivery_failure(&self) -> bool {
        match self {
            Self::ConnectionClosed | Self::QueueFull => true,
            Self::Tungstenite(err) => matches!(
                err,
                tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Io(_)
                    | tungstenite::Error::Protocol(_)
            ),
            Self::InvalidUpgrade(_) => false,
        }
    }
}

impl From<WebSocketError> for dbpulse_core::ApiError {
    fn from(err: WebSocketError) -> Self {
        match err {
            WebSocketError::InvalidUpgrade(msg) => {
                dbpulse_core::ApiError::bad_request(format!("WebSocket upgrade failed: {}", msg))
            }
            _ => dbpulse_core::ApiError::internal(err.to_string()),
        }
    }
}
