//! Fan-out of one message to every registered connection

use crate::registry::ConnectionRegistry;
use crate::Message;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one [`Broadcaster::broadcast`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that queued the message
    pub delivered: usize,
    /// Connections removed from the registry because they were lost or stalled
    pub pruned: usize,
}

/// Delivers messages to every connection in a [`ConnectionRegistry`]
///
/// # Example
///
/// ```rust,ignore
/// let registry = Arc::new(ConnectionRegistry::new());
/// let broadcaster = Broadcaster::new(registry.clone());
///
/// let report = broadcaster.broadcast(&Message::text("DB Changed: []"));
/// tracing::info!(delivered = report.delivered, "sent");
/// ```
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this broadcaster delivers to
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Queue `message` on every connection registered right now.
    ///
    /// Never waits on a client: each connection's writer task does the actual
    /// send. A connection whose writer has stopped, or whose queue is full
    /// because the client stopped reading, is removed from the registry.
    /// Nothing is retried and no error reaches the caller.
    pub fn broadcast(&self, message: &Message) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for conn in self.registry.snapshot() {
            match conn.enqueue(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    debug!(connection_id = conn.id(), error = %err, "Delivery failed, dropping connection");
                    if self.registry.remove(&conn) {
                        report.pruned += 1;
                    }
                }
            }
        }

        debug!(
            delivered = report.delivered,
            pruned = report.pruned,
            "Broadcast complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Connection, MessageSink, WebSocketError};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Sink backed by a channel; dropping the receiver simulates a closed client
    struct ChannelSink(mpsc::UnboundedSender<Message>);

    #[async_trait]
    impl MessageSink for ChannelSink {
        async fn send(&mut self, msg: Message) -> Result<(), WebSocketError> {
            self.0.send(msg).map_err(|_| WebSocketError::ConnectionClosed)
        }
    }

    struct StalledSink;

    #[async_trait]
    impl MessageSink for StalledSink {
        async fn send(&mut self, _msg: Message) -> Result<(), WebSocketError> {
            std::future::pending().await
        }
    }

    struct OversizeSink;

    #[async_trait]
    impl MessageSink for OversizeSink {
        async fn send(&mut self, _msg: Message) -> Result<(), WebSocketError> {
            Err(WebSocketError::Tungstenite(tungstenite::Error::Capacity(
                tungstenite::error::CapacityError::MessageTooLong {
                    size: 2,
                    max_size: 1,
                },
            )))
        }
    }

    fn client() -> (Arc<Connection>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(ChannelSink(tx)), rx)
    }

    /// A connection whose client went away and whose writer already noticed
    async fn lost_client() -> Arc<Connection> {
        let (conn, rx) = client();
        drop(rx);
        conn.enqueue(Message::text("warm-up")).unwrap();
        tokio::time::timeout(Duration::from_secs(5), conn.closed())
            .await
            .unwrap();
        conn
    }

    #[tokio::test]
    async fn empty_registry_is_a_no_op() {
        let broadcaster = Broadcaster::new(Arc::new(ConnectionRegistry::new()));
        let report = broadcaster.broadcast(&Message::text("x"));
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn closed_connection_is_pruned_others_still_receive() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, mut rx_a) = client();
        let b = lost_client().await;
        let (c, mut rx_c) = client();
        registry.add(a.clone());
        registry.add(b.clone());
        registry.add(c.clone());

        let broadcaster = Broadcaster::new(registry.clone());
        let report = broadcaster.broadcast(&Message::text("DB Changed: []"));

        assert_eq!(report.delivered, 2);
        assert_eq!(report.pruned, 1);
        assert!(registry.contains(&a));
        assert!(!registry.contains(&b));
        assert!(registry.contains(&c));
        assert_eq!(rx_a.recv().await.unwrap().as_text(), Some("DB Changed: []"));
        assert_eq!(rx_c.recv().await.unwrap().as_text(), Some("DB Changed: []"));
    }

    #[tokio::test]
    async fn successive_broadcasts_arrive_in_order() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, mut rx) = client();
        registry.add(a);
        let broadcaster = Broadcaster::new(registry);

        for i in 0..5 {
            broadcaster.broadcast(&Message::text(format!("m{}", i)));
        }
        for i in 0..5 {
            assert_eq!(rx.recv().await.unwrap(), Message::text(format!("m{}", i)));
        }
    }

    #[tokio::test]
    async fn stalled_client_does_not_hold_up_the_others() {
        let registry = Arc::new(ConnectionRegistry::new());
        let stalled = Connection::with_capacity(StalledSink, 2);
        let (healthy, mut rx) = client();
        registry.add(stalled.clone());
        registry.add(healthy);
        let broadcaster = Broadcaster::new(registry.clone());

        // one message in the writer, two queued, the next one overflows
        for i in 0..4 {
            broadcaster.broadcast(&Message::text(format!("m{}", i)));
        }

        assert!(!registry.contains(&stalled));
        assert_eq!(registry.len(), 1);
        for i in 0..4 {
            assert_eq!(rx.recv().await.unwrap(), Message::text(format!("m{}", i)));
        }
    }

    #[tokio::test]
    async fn non_delivery_errors_keep_the_connection() {
        let registry = Arc::new(ConnectionRegistry::new());
        let conn = Connection::new(OversizeSink);
        registry.add(conn.clone());
        let broadcaster = Broadcaster::new(registry.clone());

        broadcaster.broadcast(&Message::text("big"));
        tokio::task::yield_now().await;
        let report = broadcaster.broadcast(&Message::text("big"));

        assert_eq!(report.delivered, 1);
        assert!(registry.contains(&conn));
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn already_removed_connection_is_not_targeted() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (a, _rx) = client();
        registry.add(a.clone());
        // the connection task noticed the disconnect first
        registry.remove(&a);

        let report = Broadcaster::new(registry).broadcast(&Message::text("x"));
        assert_eq!(report, BroadcastReport::default());
    }
}
