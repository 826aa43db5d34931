//! Liveness checking for idle WebSocket clients
//!
//! Live-update clients never send anything on their own, so silence alone
//! says nothing. A managed connection pings the peer every `interval`; the
//! pong (or any other frame) counts as a sign of life. After
//! `interval + timeout` without one the socket is closed, and the next
//! broadcast prunes the connection.

use std::time::Duration;

/// Ping period used when none is configured
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Extra time granted past the ping period before giving up on a peer
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Heartbeat settings for a managed WebSocket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsHeartbeatConfig {
    /// Time between pings
    pub interval: Duration,
    /// Grace period after a missed pong
    pub timeout: Duration,
}

impl Default for WsHeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PING_INTERVAL,
            timeout: DEFAULT_PONG_TIMEOUT,
        }
    }
}

impl WsHeartbeatConfig {
    /// Defaults: 30 s pings, 10 s grace
    pub fn new() -> Self {
        Self::default()
    }

    /// Heartbeat pinging every `secs` seconds; `0` means no heartbeat
    pub fn every_secs(secs: u64) -> Option<Self> {
        (secs > 0).then(|| Self::new().interval(Duration::from_secs(secs)))
    }

    /// Override the ping period
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Override the grace period
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Longest silence tolerated before the connection is dropped
    pub fn max_idle(&self) -> Duration {
        self.interval + self.timeout
    }
}
