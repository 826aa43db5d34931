use async_trait::async_trait;
use dbpulse_notify::{ChangeNotificationService, NotifyError, TickOutcome};
use dbpulse_store::{MemoryStore, Record, RecordStore};
use dbpulse_ws::{Broadcaster, Connection, ConnectionRegistry, Message, MessageSink, WebSocketError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct ChannelSink(mpsc::UnboundedSender<Message>);

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send(&mut self, msg: Message) -> Result<(), WebSocketError> {
        self.0.send(msg).map_err(|_| WebSocketError::ConnectionClosed)
    }
}

struct Fixture {
    store: MemoryStore,
    registry: Arc<ConnectionRegistry>,
    service: ChangeNotificationService,
}

fn fixture(store: MemoryStore) -> Fixture {
    let registry = Arc::new(ConnectionRegistry::new());
    let service = ChangeNotificationService::new(
        Arc::new(store.clone()),
        Broadcaster::new(registry.clone()),
    );
    Fixture {
        store,
        registry,
        service,
    }
}

fn connect(registry: &ConnectionRegistry) -> mpsc::UnboundedReceiver<Message> {
    let (tx, rx) = mpsc::unbounded_channel();
    registry.add(Connection::new(ChannelSink(tx)));
    rx
}

/// Sink whose sends never complete, like a client that stopped reading
struct StalledSink;

#[async_trait]
impl MessageSink for StalledSink {
    async fn send(&mut self, _msg: Message) -> Result<(), WebSocketError> {
        std::future::pending().await
    }
}

/// Register a client that has gone away and whose writer has noticed
async fn connect_lost(registry: &ConnectionRegistry) {
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = Connection::new(ChannelSink(tx));
    drop(rx);
    conn.enqueue(Message::text("warm-up")).unwrap();
    tokio::time::timeout(Duration::from_secs(5), conn.closed())
        .await
        .unwrap();
    registry.add(conn);
}

/// Everything delivered until the client has been quiet for a moment
async fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(Some(msg)) = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
        out.push(msg.as_text().unwrap_or_default().to_string());
    }
    out
}

#[tokio::test]
async fn write_then_tick_broadcasts_once() {
    let f = fixture(MemoryStore::new());
    let mut rx = connect(&f.registry);

    f.store.insert("a", "1").await.unwrap();
    let notified = f.service.notify_now().await.unwrap();
    assert_eq!(notified.report.unwrap().delivered, 1);
    assert_eq!(notified.snapshot.records(), &[Record::new(1, "a", "1")]);

    assert_eq!(f.service.tick().await.unwrap(), TickOutcome::Unchanged);
    assert_eq!(drain(&mut rx).await, vec!["DB Changed: [(1, 'a', '1')]"]);
}

#[tokio::test]
async fn identical_polls_do_not_broadcast() {
    let f = fixture(MemoryStore::with_rows([("a", "1")]));
    let mut rx = connect(&f.registry);

    assert!(matches!(f.service.tick().await.unwrap(), TickOutcome::Broadcast(_)));
    assert_eq!(f.service.tick().await.unwrap(), TickOutcome::Unchanged);
    assert_eq!(f.service.tick().await.unwrap(), TickOutcome::Unchanged);
    assert_eq!(drain(&mut rx).await.len(), 1);
}

#[tokio::test]
async fn any_field_change_broadcasts_new_sequence() {
    let f = fixture(MemoryStore::with_rows([("a", "1"), ("b", "2")]));
    f.service.tick().await.unwrap();
    let mut rx = connect(&f.registry);

    f.store.edit_value(2, "x").unwrap();
    assert!(matches!(f.service.tick().await.unwrap(), TickOutcome::Broadcast(_)));
    assert_eq!(
        drain(&mut rx).await,
        vec!["DB Changed: [(1, 'a', '1'), (2, 'b', 'x')]"]
    );
    assert_eq!(
        f.service.retained().await.unwrap().records(),
        &[Record::new(1, "a", "1"), Record::new(2, "b", "x")]
    );
}

#[tokio::test]
async fn empty_store_at_startup_is_recorded_silently() {
    let f = fixture(MemoryStore::new());
    let mut rx = connect(&f.registry);

    assert!(f.service.retained().await.is_none());
    assert_eq!(f.service.tick().await.unwrap(), TickOutcome::Initialized);
    assert!(f.service.retained().await.unwrap().is_empty());
    assert!(drain(&mut rx).await.is_empty());
}

#[tokio::test]
async fn populated_store_at_startup_is_announced_by_default() {
    let f = fixture(MemoryStore::with_rows([("a", "1")]));
    let mut rx = connect(&f.registry);

    assert!(matches!(f.service.tick().await.unwrap(), TickOutcome::Broadcast(_)));
    assert_eq!(drain(&mut rx).await, vec!["DB Changed: [(1, 'a', '1')]"]);
}

#[tokio::test]
async fn initial_announcement_can_be_disabled() {
    let store = MemoryStore::with_rows([("a", "1")]);
    let registry = Arc::new(ConnectionRegistry::new());
    let service = ChangeNotificationService::new(
        Arc::new(store.clone()),
        Broadcaster::new(registry.clone()),
    )
    .announce_initial(false);
    let mut rx = connect(&registry);

    assert_eq!(service.tick().await.unwrap(), TickOutcome::Initialized);
    assert!(drain(&mut rx).await.is_empty());

    store.edit_value(1, "2").unwrap();
    assert!(matches!(service.tick().await.unwrap(), TickOutcome::Broadcast(_)));
    assert_eq!(drain(&mut rx).await, vec!["DB Changed: [(1, 'a', '2')]"]);
}

#[tokio::test]
async fn failed_read_skips_without_touching_retained() {
    let f = fixture(MemoryStore::with_rows([("a", "1")]));
    f.service.tick().await.unwrap();
    let mut rx = connect(&f.registry);

    f.store.set_unavailable(true);
    assert!(matches!(f.service.tick().await, Err(NotifyError::Store(_))));
    assert!(matches!(f.service.notify_now().await, Err(NotifyError::Store(_))));
    assert_eq!(f.service.retained().await.unwrap().len(), 1);

    f.store.set_unavailable(false);
    assert_eq!(f.service.tick().await.unwrap(), TickOutcome::Unchanged);
    assert!(drain(&mut rx).await.is_empty());
}

#[tokio::test]
async fn closed_client_is_pruned_and_others_still_notified() {
    let f = fixture(MemoryStore::new());
    let mut a = connect(&f.registry);
    connect_lost(&f.registry).await;
    let mut c = connect(&f.registry);

    f.store.insert("a", "1").await.unwrap();
    let report = f.service.notify_now().await.unwrap().report.unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(report.pruned, 1);
    assert_eq!(f.registry.len(), 2);
    assert_eq!(drain(&mut a).await.len(), 1);
    assert_eq!(drain(&mut c).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_reach_each_client_in_store_order() {
    let f = Arc::new(fixture(MemoryStore::new()));
    let mut rx = connect(&f.registry);

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let f = f.clone();
            tokio::spawn(async move {
                f.store.insert(&format!("n{}", i), "v").await.unwrap();
                f.service.notify_now().await.unwrap().report.is_some()
            })
        })
        .collect();
    let mut broadcasts = 0;
    for writer in writers {
        if writer.await.unwrap() {
            broadcasts += 1;
        }
    }

    // writers that land together share one announcement
    let messages = drain(&mut rx).await;
    assert_eq!(messages.len(), broadcasts);
    // every message carries a full store state, and states never go backwards
    let sizes: Vec<usize> = messages.iter().map(|m| m.matches('(').count()).collect();
    assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(sizes.last(), Some(&8));
}

#[tokio::test]
async fn tick_between_write_and_notify_announces_once() {
    let f = fixture(MemoryStore::with_rows([("a", "1")]));
    f.service.tick().await.unwrap();
    let mut rx = connect(&f.registry);

    f.store.update(1, "2").await.unwrap();
    assert!(matches!(f.service.tick().await.unwrap(), TickOutcome::Broadcast(_)));
    let notified = f.service.notify_now().await.unwrap();
    assert_eq!(notified.report, None);
    assert_eq!(notified.snapshot.records(), &[Record::new(1, "a", "2")]);
    assert_eq!(f.service.tick().await.unwrap(), TickOutcome::Unchanged);

    assert_eq!(drain(&mut rx).await, vec!["DB Changed: [(1, 'a', '2')]"]);
}

#[tokio::test]
async fn stalled_client_does_not_block_later_writes() {
    let f = fixture(MemoryStore::new());
    f.registry.add(Connection::with_capacity(StalledSink, 1));
    let mut rx = connect(&f.registry);

    for i in 0..4 {
        f.store.insert(&format!("n{}", i), "v").await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), f.service.notify_now())
            .await
            .expect("a stalled client held up the notification")
            .unwrap();
    }

    assert_eq!(drain(&mut rx).await.len(), 4);
    assert_eq!(f.registry.len(), 1);
}
