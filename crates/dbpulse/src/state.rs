use crate::config::Config;
use dbpulse_notify::ChangeNotificationService;
use dbpulse_store::RecordStore;
use dbpulse_ws::{Broadcaster, ConnectionRegistry, WsHeartbeatConfig};
use std::sync::Arc;

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Arc<ChangeNotificationService>,
    pub heartbeat: Option<WsHeartbeatConfig>,
}

impl AppState {
    /// Wire a store to a fresh registry and notification service
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = ChangeNotificationService::new(store.clone(), Broadcaster::new(registry.clone()))
            .announce_initial(config.announce_initial);

        Self {
            store,
            registry,
            notifier: Arc::new(notifier),
            heartbeat: config.heartbeat(),
        }
    }
}
