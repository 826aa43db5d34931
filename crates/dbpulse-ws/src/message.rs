//! Frames exchanged with live-update clients
//!
//! Outbound traffic is only ever [`Message::Text`]; the other variants exist
//! so inbound frames can be classified (and mostly ignored).

use std::borrow::Cow;
use tungstenite::Message as Wire;

/// One WebSocket frame, decoupled from the tungstenite type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// UTF-8 payload; every change notification is one of these
    Text(String),
    /// Binary payload
    Binary(Vec<u8>),
    /// Ping control frame
    Ping(Vec<u8>),
    /// Pong control frame
    Pong(Vec<u8>),
    /// Close control frame with its optional status
    Close(Option<CloseFrame>),
}

/// Status carried by a close frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// RFC 6455 close code
    pub code: u16,
    /// Human-readable reason, possibly empty
    pub reason: String,
}

impl Message {
    /// A text frame
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Whether the peer is ending the session
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }

    /// Text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Wire> for Message {
    fn from(msg: Wire) -> Self {
        match msg {
            Wire::Text(text) => Self::Text(text),
            Wire::Binary(data) => Self::Binary(data),
            Wire::Ping(data) => Self::Ping(data),
            Wire::Pong(data) => Self::Pong(data),
            Wire::Close(frame) => Self::Close(frame.map(|f| CloseFrame {
                code: f.code.into(),
                reason: f.reason.into_owned(),
            })),
            // raw frames are only produced when writing
            Wire::Frame(_) => Self::Binary(Vec::new()),
        }
    }
}

impl From<Message> for Wire {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(text) => Wire::Text(text),
            Message::Binary(data) => Wire::Binary(data),
            Message::Ping(data) => Wire::Ping(data),
            Message::Pong(data) => Wire::Pong(data),
            Message::Close(frame) => Wire::Close(frame.map(|f| {
                tungstenite::protocol::CloseFrame {
                    code: f.code.into(),
                    reason: Cow::Owned(f.reason),
                }
            })),
        }
    }
}
