//! Socket transport seam.
//!
//! The client talks to the server through [`Transport`] (which opens
//! connections) and [`Socket`] (a live connection handle). The default
//! implementation is [`SocketIoTransport`]; tests substitute a mock.

mod connection;
pub(crate) mod packet;
mod socketio;

#[cfg(test)]
pub(crate) mod mock;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::auth::TokenProvider;
use crate::error::RealtimeError;
use crate::types::ConnectionState;

pub use socketio::SocketIoTransport;

/// Parameters sent with each namespace handshake (the auth token).
pub type Handshake = BTreeMap<String, String>;

/// Build a handshake from the provider's current token.
pub(crate) async fn resolve_handshake(
    tokens: &dyn TokenProvider,
) -> Result<Handshake, RealtimeError> {
    let mut handshake = Handshake::new();
    if let Some(token) = tokens.access_token().await? {
        handshake.insert("token".to_string(), token);
    }
    Ok(handshake)
}

/// Events reported by a socket to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// The namespace handshake completed (initially or after a reconnect).
    Connected { sid: Option<String> },
    /// A connection attempt failed or was rejected by the server.
    ConnectError(String),
    /// An established connection was lost.
    Disconnected { reason: String },
    /// Any other server-pushed event.
    Event {
        name: String,
        args: Vec<serde_json::Value>,
    },
}

/// Outcome of [`Socket::emit_with_ack`].
#[derive(Debug, Clone, PartialEq)]
pub enum AckReply {
    Ack(Vec<serde_json::Value>),
    /// No acknowledgement within the timeout.
    NoAck,
    /// The connection dropped before an acknowledgement arrived.
    Disconnected,
}

/// Opens socket connections.
pub trait Transport: Send + Sync {
    /// Start connecting. The returned receiver is live before the handshake
    /// begins, so the first `Connected`/`ConnectError` cannot be missed.
    ///
    /// `handshake` is used for the first attempt. Automatic reconnects ask
    /// `tokens` again so a rotated token is never replayed stale.
    fn open(
        &self,
        handshake: Handshake,
        tokens: Arc<dyn TokenProvider>,
    ) -> (Arc<dyn Socket>, mpsc::Receiver<SocketEvent>);
}

/// A live connection handle.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Server-assigned socket id, while connected.
    fn id(&self) -> Option<String>;

    fn status(&self) -> ConnectionState;

    /// Queue an event without waiting for delivery.
    fn emit(&self, event: &str, payload: serde_json::Value) -> Result<(), RealtimeError>;

    /// Send an event and wait for the server's acknowledgement.
    async fn emit_with_ack(
        &self,
        event: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> AckReply;

    /// Close the connection and stop reconnecting.
    fn disconnect(&self);
}
