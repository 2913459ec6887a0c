//! Configuration for a client session.

use std::time::Duration;

/// Configuration for a client session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the document server.
    pub url: String,
    /// Interval between reconnect attempts while disconnected.
    pub reconnect_interval: Duration,
}

impl SessionConfig {
    /// Creates a new session configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_interval: Duration::from_secs(1),
        }
    }

    /// Sets the reconnect interval.
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("")
    }
}
