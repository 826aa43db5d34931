//! # dbpulse-ws
//!
//! WebSocket support for dbpulse.
//!
//! - **Upgrade**: HTTP to WebSocket handshake via the [`WebSocket`] extractor
//! - **Heartbeat**: optional ping/pong management that closes silent peers
//! - **Registry**: the set of live client connections, [`ConnectionRegistry`]
//! - **Broadcast**: best-effort fan-out through per-connection queues, with
//!   self-pruning of lost or stalled clients, [`Broadcaster`]
//!
//! ```rust,ignore
//! async fn live(ws: WebSocket, State(registry): State<Arc<ConnectionRegistry>>) -> WebSocketUpgrade {
//!     ws.on_upgrade(move |socket| async move {
//!         let (sender, mut receiver) = socket.split();
//!         let conn = Connection::new(sender);
//!         registry.add(conn.clone());
//!         while let Some(Ok(_)) = receiver.recv().await {}
//!         registry.remove(&conn);
//!     })
//! }
//! ```

// tungstenite errors are large; they are carried by value in Results
#![allow(clippy::result_large_err)]
#![warn(missing_docs)]

mod broadcaster;
mod error;
mod extractor;
mod heartbeat;
mod message;
mod registry;
mod socket;
mod upgrade;

pub use broadcaster::{BroadcastReport, Broadcaster};
pub use error::WebSocketError;
pub use extractor::WebSocket;
pub use heartbeat::{WsHeartbeatConfig, DEFAULT_PING_INTERVAL, DEFAULT_PONG_TIMEOUT};
pub use message::{CloseFrame, Message};
pub use registry::{Connection, ConnectionRegistry, MessageSink, OUTBOUND_QUEUE_CAPACITY};
pub use socket::{WebSocketReceiver, WebSocketSender, WebSocketStream};
pub use upgrade::WebSocketUpgrade;
