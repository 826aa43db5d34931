//! Registry of live WebSocket connections
//!
//! The registry is the authoritative set of broadcast targets. A connection
//! is added when its WebSocket is accepted and removed when the client goes
//! away or a delivery to it fails. Membership changes and snapshots share a
//! single lock; sends never happen under it.
//!
//! Each [`Connection`] owns a bounded outbound queue drained by its own writer
//! task, so enqueueing never waits on the network and a stalled client only
//! ever fills its own queue.

use crate::{Message, WebSocketError, WebSocketSender};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error};

/// Messages a connection may have queued before it counts as stalled
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Outbound half of a client channel
///
/// Implemented by [`WebSocketSender`]; tests and alternative transports can
/// provide their own.
#[async_trait]
pub trait MessageSink: Send {
    /// Deliver one message to the client
    async fn send(&mut self, msg: Message) -> Result<(), WebSocketError>;
}

#[async_trait]
impl MessageSink for WebSocketSender {
    async fn send(&mut self, msg: Message) -> Result<(), WebSocketError> {
        WebSocketSender::send(self, msg).await
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A live client connection
///
/// Identity is reference identity: two handles denote the same connection
/// only if they point at the same allocation. The numeric id is for logs.
pub struct Connection {
    id: u64,
    outbound: mpsc::Sender<Message>,
}

impl Connection {
    /// Wrap the outbound half of a freshly accepted client channel.
    ///
    /// Spawns the writer task, so this must be called within a tokio runtime.
    pub fn new(sink: impl MessageSink + 'static) -> Arc<Self> {
        Self::with_capacity(sink, OUTBOUND_QUEUE_CAPACITY)
    }

    /// Like [`Connection::new`] with an explicit queue capacity (at least one)
    pub fn with_capacity(sink: impl MessageSink + 'static, capacity: usize) -> Arc<Self> {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let (outbound, queue) = mpsc::channel(capacity.max(1));
        tokio::spawn(write_queued(id, Box::new(sink), queue));
        Arc::new(Self { id, outbound })
    }

    /// Process-unique id, for logging
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue one message for delivery without waiting for the client.
    ///
    /// Messages leave in the order they were queued. Fails with
    /// [`WebSocketError::QueueFull`] when the client has stopped reading, and
    /// with [`WebSocketError::ConnectionClosed`] once the writer has given up.
    pub fn enqueue(&self, msg: Message) -> Result<(), WebSocketError> {
        self.outbound.try_send(msg).map_err(|err| match err {
            TrySendError::Full(_) => WebSocketError::QueueFull,
            TrySendError::Closed(_) => WebSocketError::ConnectionClosed,
        })
    }

    /// Whether the writer has stopped after losing the client
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Resolves once the writer has stopped after losing the client
    pub async fn closed(&self) {
        self.outbound.closed().await
    }
}

/// Drain one connection's queue into its sink until the client is lost or
/// the last handle to the connection is dropped.
async fn write_queued(id: u64, mut sink: Box<dyn MessageSink>, mut queue: mpsc::Receiver<Message>) {
    while let Some(msg) = queue.recv().await {
        match sink.send(msg).await {
            Ok(()) => {}
            Err(err) if err.is_delivery_failure() => {
                debug!(connection_id = id, error = %err, "Client lost, writer stopping");
                break;
            }
            Err(err) => {
                error!(connection_id = id, error = %err, "Message rejected by connection");
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Thread-safe set of live connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<Vec<Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn members(&self) -> MutexGuard<'_, Vec<Arc<Connection>>> {
        // membership stays consistent even if a holder panicked: every
        // critical section is a single push, retain or clone
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a newly accepted connection
    pub fn add(&self, conn: Arc<Connection>) {
        let mut members = self.members();
        if !members.iter().any(|c| Arc::ptr_eq(c, &conn)) {
            members.push(conn);
        }
    }

    /// Unregister a connection. Returns `true` if it was present;
    /// removing an absent connection is a no-op.
    pub fn remove(&self, conn: &Arc<Connection>) -> bool {
        let mut members = self.members();
        let before = members.len();
        members.retain(|c| !Arc::ptr_eq(c, conn));
        members.len() != before
    }

    /// Point-in-time copy of the membership, in registration order
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.members().clone()
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.members().len()
    }

    /// Whether no connection is registered
    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    /// Whether this exact connection is registered
    pub fn contains(&self, conn: &Arc<Connection>) -> bool {
        self.members().iter().any(|c| Arc::ptr_eq(c, conn))
    }
}
