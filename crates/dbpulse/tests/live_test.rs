use dbpulse::{build_app, AppState, Config};
use dbpulse_notify::SnapshotPoller;
use dbpulse_store::{RecordStore, SqliteStore};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// The next text frame must be `expected`; control frames are skipped
async fn expect_text(client: &mut Client, expected: &str) {
    let next = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = client.next().await {
            if let Ok(tungstenite::Message::Text(text)) = msg {
                return Some(text);
            }
        }
        None
    })
    .await;
    assert_eq!(next, Ok(Some(expected.to_string())));
}

async fn wait_for_clients(state: &AppState, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.registry.len() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client count never settled");
}

async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn clients_follow_writes_and_external_edits() {
    let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
    let config = Config {
        poll_interval_ms: 50,
        ..Config::default()
    };
    let state = AppState::new(store.clone(), &config);
    let poller = SnapshotPoller::new(state.notifier.clone())
        .interval(config.poll_interval())
        .start();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(build_app(state.clone()).serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let (mut first, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let (mut second, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    wait_for_clients(&state, 2).await;

    let response = http_get(addr, "/add/a/1").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    expect_text(&mut first, "DB Changed: [(1, 'a', '1')]").await;
    expect_text(&mut second, "DB Changed: [(1, 'a', '1')]").await;

    // a departed client is dropped and the rest keep receiving
    second.close(None).await.unwrap();
    wait_for_clients(&state, 1).await;

    http_get(addr, "/update/1/2").await;
    expect_text(&mut first, "DB Changed: [(1, 'a', '2')]").await;

    // edit behind the service's back; the poller picks it up
    store.update(1, "3").await.unwrap();
    expect_text(&mut first, "DB Changed: [(1, 'a', '3')]").await;

    // inbound chatter is ignored
    first
        .send(tungstenite::Message::Text("hello?".to_string()))
        .await
        .unwrap();
    assert_eq!(state.registry.len(), 1);

    first.close(None).await.unwrap();
    wait_for_clients(&state, 0).await;

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
    poller.stop().await;
    assert_eq!(store.read_all().await.unwrap().len(), 1);
}
