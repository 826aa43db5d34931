//! HTTP and WebSocket endpoints

use crate::state::AppState;
use dbpulse_core::{get, ApiError, App, Html, Json, Path, Result, State};
use dbpulse_notify::NotifyError;
use dbpulse_store::{Record, StoreError};
use dbpulse_ws::{Connection, WebSocket, WebSocketUpgrade};
use http::StatusCode;
use serde::Serialize;
use tracing::{debug, info};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Live DB Updates</title></head>
<body>
    <h1>DB Live Updates</h1>
    <pre id="output">Waiting for DB updates...</pre>
    <script>
        const ws = new WebSocket(`ws://${location.host}/ws`);
        ws.onmessage = (event) => {
            document.getElementById("output").innerText = event.data;
        };
    </script>
</body>
</html>"#;

/// Build the application with every route
pub fn build_app(state: AppState) -> App {
    App::new()
        .state(state)
        .route("/", get(index))
        .route("/ws", get(live))
        .route("/add/{name}/{value}", get(add_record))
        .route("/update/{id}/{value}", get(update_record))
        .route("/health", get(health))
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(id) => ApiError::not_found(format!("Record {} not found", id)),
        StoreError::Unavailable(detail) => {
            ApiError::service_unavailable("Record store unavailable").with_internal(detail)
        }
    }
}

fn notify_error(err: NotifyError) -> ApiError {
    match err {
        NotifyError::Store(err) => store_error(err),
    }
}

#[derive(Debug, Serialize)]
struct AddResponse {
    status: &'static str,
    id: i64,
    rows: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    status: &'static str,
    rows: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    connections: usize,
    records: Option<usize>,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Live updates; inbound frames are read only to notice the client leaving
async fn live(ws: WebSocket, State(state): State<AppState>) -> WebSocketUpgrade {
    let registry = state.registry.clone();
    let upgrade = ws.on_upgrade(move |socket| async move {
        let (sender, mut receiver) = socket.split();
        let conn = Connection::new(sender);
        registry.add(conn.clone());
        info!(connection_id = conn.id(), clients = registry.len(), "Client connected");

        let reader = async {
            while let Some(msg) = receiver.recv().await {
                match msg {
                    Ok(msg) if msg.is_close() => break,
                    Ok(_) => {}
                    Err(err) => {
                        debug!(connection_id = conn.id(), error = %err, "Receive error");
                        break;
                    }
                }
            }
        };
        // the writer stops first when a send to the client fails
        tokio::select! {
            _ = reader => {}
            _ = conn.closed() => {}
        }

        registry.remove(&conn);
        info!(connection_id = conn.id(), clients = registry.len(), "Client disconnected");
    });

    match state.heartbeat {
        Some(config) => upgrade.heartbeat(config),
        None => upgrade,
    }
}

async fn add_record(
    Path((name, value)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<AddResponse>> {
    let id = state.store.insert(&name, &value).await.map_err(store_error)?;
    let notified = state.notifier.notify_now().await.map_err(notify_error)?;

    Ok(Json(AddResponse {
        status: "added",
        id,
        rows: notified.snapshot.records().to_vec(),
    }))
}

async fn update_record(
    Path((id, value)): Path<(i64, String)>,
    State(state): State<AppState>,
) -> Result<Json<UpdateResponse>> {
    state.store.update(id, &value).await.map_err(store_error)?;
    let notified = state.notifier.notify_now().await.map_err(notify_error)?;

    Ok(Json(UpdateResponse {
        status: "updated",
        rows: notified.snapshot.records().to_vec(),
    }))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connections = state.registry.len();
    match state.store.read_all().await {
        Ok(rows) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                connections,
                records: Some(rows.len()),
            }),
        ),
        Err(err) => {
            debug!(error = %err, "Health check read failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    connections,
                    records: None,
                }),
            )
        }
    }
}
