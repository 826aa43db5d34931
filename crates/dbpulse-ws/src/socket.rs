//! WebSocket stream implementation

use crate::{Message, WebSocketError, WsHeartbeatConfig};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream as TungsteniteStream;

/// Byte transport under a WebSocket (an upgraded HTTP connection in production)
pub(crate) trait Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Transport for T {}

type RawConnection = TungsteniteStream<Box<dyn Transport>>;

/// Capacity of the queues between a managed connection and its I/O task
const MANAGED_QUEUE_CAPACITY: usize = 32;

#[allow(clippy::large_enum_variant)]
enum StreamImpl {
    /// Direct connection (no heartbeat)
    Direct(RawConnection),
    /// Managed connection (heartbeat and I/O running in a background task)
    Managed {
        tx: mpsc::Sender<Message>,
        rx: mpsc::Receiver<Result<Message, WebSocketError>>,
    },
}

/// A server-side WebSocket stream
pub struct WebSocketStream {
    inner: StreamImpl,
}

impl WebSocketStream {
    /// Wrap an already upgraded transport, speaking the server role.
    ///
    /// With a heartbeat config the connection is handed to a background task
    /// that pings the peer and closes the socket once it goes silent.
    pub async fn from_raw_socket<S>(io: S, heartbeat: Option<WsHeartbeatConfig>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io: Box<dyn Transport> = Box::new(io);
        let raw = TungsteniteStream::from_raw_socket(io, Role::Server, None).await;
        match heartbeat {
            Some(config) => Self::new_managed(raw, config),
            None => Self {
                inner: StreamImpl::Direct(raw),
            },
        }
    }

    fn new_managed(inner: RawConnection, config: WsHeartbeatConfig) -> Self {
        let (mut sender, mut receiver) = inner.split();
        let (user_tx, mut outbound_rx) = mpsc::channel::<Message>(MANAGED_QUEUE_CAPACITY);
        let (inbound_tx, user_rx) =
            mpsc::channel::<Result<Message, WebSocketError>>(MANAGED_QUEUE_CAPACITY);

        tokio::spawn(async move {
            let mut ping_interval = tokio::time::interval(config.interval);
            // the first tick completes immediately
            ping_interval.tick().await;
            let mut idle_check = tokio::time::interval(config.timeout);
            let mut last_seen = tokio::time::Instant::now();

            loop {
                tokio::select! {
                    incoming = receiver.next() => match incoming {
                        Some(Ok(msg)) => {
                            last_seen = tokio::time::Instant::now();
                            match msg {
                                tungstenite::Message::Pong(_) => continue,
                                tungstenite::Message::Ping(data) => {
                                    // split halves do not answer pings on their own
                                    if sender.send(tungstenite::Message::Pong(data)).await.is_err() {
                                        break;
                                    }
                                }
                                other => {
                                    if inbound_tx.send(Ok(Message::from(other))).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Some(Err(e)) => {
                            let _ = inbound_tx.send(Err(WebSocketError::from(e))).await;
                            break;
                        }
                        None => break,
                    },

                    outgoing = outbound_rx.recv() => match outgoing {
                        Some(msg) => {
                            if sender.send(msg.into()).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },

                    _ = ping_interval.tick() => {
                        if sender.send(tungstenite::Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }

                    _ = idle_check.tick() => {
                        if last_seen.elapsed() > config.max_idle() {
                            tracing::debug!("WebSocket peer silent past heartbeat timeout, closing");
                            break;
                        }
                    }
                }
            }
            // dropping both halves closes the socket; both user channels observe it
            let _ = sender.close().await;
        });

        Self {
            inner: StreamImpl::Managed {
                tx: user_tx,
                rx: user_rx,
            },
        }
    }

    /// Split the stream into sender and receiver halves
    pub fn split(self) -> (WebSocketSender, WebSocketReceiver) {
        match self.inner {
            StreamImpl::Direct(inner) => {
                let (sink, stream) = inner.split();
                (
                    WebSocketSender {
                        inner: SenderImpl::Direct(sink),
                    },
                    WebSocketReceiver {
                        inner: ReceiverImpl::Direct(stream),
                    },
                )
            }
            StreamImpl::Managed { tx, rx } => (
                WebSocketSender {
                    inner: SenderImpl::Managed(tx),
                },
                WebSocketReceiver {
                    inner: ReceiverImpl::Managed(rx),
                },
            ),
        }
    }
}

enum SenderImpl {
    Direct(SplitSink<RawConnection, tungstenite::Message>),
    Managed(mpsc::Sender<Message>),
}

/// Sender half of a WebSocket stream
pub struct WebSocketSender {
    inner: SenderImpl,
}

impl WebSocketSender {
    /// Send a message
    pub async fn send(&mut self, msg: Message) -> Result<(), WebSocketError> {
        match &mut self.inner {
            SenderImpl::Direct(s) => s.send(msg.into()).await.map_err(WebSocketError::from),
            SenderImpl::Managed(s) => s
                .send(msg)
                .await
                .map_err(|_| WebSocketError::ConnectionClosed),
        }
    }

    /// Send a text message
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), WebSocketError> {
        self.send(Message::text(text)).await
    }

    /// Close the sender
    pub async fn close(mut self) -> Result<(), WebSocketError> {
        match &mut self.inner {
            SenderImpl::Direct(s) => s.close().await.map_err(WebSocketError::from),
            // dropping the queue closes the managed connection
            SenderImpl::Managed(_) => Ok(()),
        }
    }
}

enum ReceiverImpl {
    Direct(SplitStream<RawConnection>),
    Managed(mpsc::Receiver<Result<Message, WebSocketError>>),
}

/// Receiver half of a WebSocket stream
pub struct WebSocketReceiver {
    inner: ReceiverImpl,
}

impl WebSocketReceiver {
    /// Receive the next message, `None` once the connection is gone
    pub async fn recv(&mut self) -> Option<Result<Message, WebSocketError>> {
        match &mut self.inner {
            ReceiverImpl::Direct(s) => s
                .next()
                .await
                .map(|r| r.map(Message::from).map_err(WebSocketError::from)),
            ReceiverImpl::Managed(s) => s.recv().await,
        }
    }
}
