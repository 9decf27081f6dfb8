//! Configuration, wire names, and message types for the realtime client.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Runtime configuration for the realtime client.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Backend base URL (`http(s)://` or `ws(s)://`).
    pub base_url: String,
    /// Socket.IO endpoint path.
    pub path: String,
    /// How long `subscribe` waits for the server acknowledgement.
    pub ack_timeout: Duration,
    /// Bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Reconnect automatically after the connection drops.
    pub reconnect: bool,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7130".to_string(),
            path: "/socket.io/".to_string(),
            ack_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(15),
            reconnect: true,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
        }
    }
}

impl RealtimeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Build the Engine.IO WebSocket URL for the Socket.IO endpoint.
    pub(crate) fn socket_url(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };

        let mut path = self.path.trim().to_string();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !path.ends_with('/') {
            path.push('/');
        }

        format!("{base}{path}?EIO=4&transport=websocket")
    }
}

// ---------------------------------------------------------------------------
// Wire names
// ---------------------------------------------------------------------------

/// Event names used on the wire.
pub mod events {
    /// Prefix reserved for control messages.
    pub const CONTROL_PREFIX: &str = "realtime:";
    pub const SUBSCRIBE: &str = "realtime:subscribe";
    pub const UNSUBSCRIBE: &str = "realtime:unsubscribe";
    pub const PUBLISH: &str = "realtime:publish";
    /// Server-pushed business error.
    pub const ERROR: &str = "realtime:error";

    /// Client lifecycle names that never reach the listener registry.
    pub const RESERVED: &[&str] = &["connect", "disconnect", "error"];

    /// Listener key that matches every event.
    pub const WILDCARD: &str = "*";
}

/// Failure codes produced locally by `subscribe`.
///
/// Server-supplied codes are passed through unchanged.
pub mod subscribe_codes {
    pub const CONNECTION_FAILED: &str = "CONNECTION_FAILED";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const NO_SOCKET: &str = "NO_SOCKET";
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
    pub const UNKNOWN: &str = "UNKNOWN";
    /// The connection dropped while the acknowledgement was pending.
    pub const DISCONNECTED: &str = "DISCONNECTED";
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Inbound messages
// ---------------------------------------------------------------------------

/// Metadata the server attaches to every custom event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketMessageMeta {
    pub channel: Option<String>,
    pub message_id: String,
    pub sender_type: String,
    pub sender_id: Option<String>,
    /// ISO-8601 timestamp as sent by the server.
    pub timestamp: String,
}

impl SocketMessageMeta {
    /// Parse `timestamp` as an RFC 3339 instant.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A custom event delivered to listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocketMessage {
    pub meta: SocketMessageMeta,
    /// Every key of the event object except `meta`.
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl SocketMessage {
    /// True if `meta.channel` names `channel`, either bare or as `realtime:<channel>`.
    pub fn is_for_channel(&self, channel: &str) -> bool {
        match self.meta.channel.as_deref() {
            Some(c) => {
                c == channel
                    || c.strip_prefix(events::CONTROL_PREFIX)
                        .is_some_and(|rest| rest == channel)
            }
            None => false,
        }
    }
}

/// Payload of a server-pushed `realtime:error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeErrorPayload {
    #[serde(default)]
    pub channel: Option<String>,
    pub code: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Subscribe outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeResponse {
    Success {
        channel: String,
    },
    Failure {
        channel: String,
        code: String,
        message: String,
    },
}

impl SubscribeResponse {
    pub fn success(channel: &str) -> Self {
        Self::Success {
            channel: channel.to_string(),
        }
    }

    pub fn failure(channel: &str, code: &str, message: impl Into<String>) -> Self {
        Self::Failure {
            channel: channel.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn channel(&self) -> &str {
        match self {
            Self::Success { channel } | Self::Failure { channel, .. } => channel,
        }
    }

    /// Failure code, `None` on success.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { code, .. } => Some(code),
        }
    }
}
