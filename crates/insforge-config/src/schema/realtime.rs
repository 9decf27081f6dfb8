//! Realtime connection settings.

use serde::{Deserialize, Serialize};

/// Realtime (Socket.IO) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// Socket.IO endpoint path on the backend.
    pub path: String,
    /// How long `subscribe` waits for the server acknowledgement (valid range: 100-120000).
    pub ack_timeout_ms: u64,
    /// Bound on a single connection attempt, in seconds (valid range: 1-120).
    pub connect_timeout_secs: u64,
    /// Reconnect automatically after the connection drops.
    pub reconnect: bool,
    /// Base reconnect delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            path: "/socket.io/".into(),
            ack_timeout_ms: 10_000,
            connect_timeout_secs: 15,
            reconnect: true,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
        }
    }
}
