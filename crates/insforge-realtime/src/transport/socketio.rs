//! Socket.IO transport over `tokio-tungstenite`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::connection::connection_loop;
use super::packet;
use super::{AckReply, Handshake, Socket, SocketEvent, Transport};
use crate::auth::TokenProvider;
use crate::error::RealtimeError;
use crate::types::{ConnectionState, RealtimeConfig};

/// Commands from socket handles to the connection task.
#[derive(Debug)]
pub(crate) enum SocketCommand {
    /// An encoded text frame.
    Send(String),
    Close,
}

/// State shared between a socket handle and its connection task.
#[derive(Default)]
pub(crate) struct SocketShared {
    status: Mutex<ConnectionState>,
    sid: Mutex<Option<String>>,
    pending_acks: Mutex<HashMap<u64, oneshot::Sender<Vec<Value>>>>,
    next_ack_id: AtomicU64,
}

impl SocketShared {
    pub(crate) fn set_connecting(&self) {
        *self.status.lock() = ConnectionState::Connecting;
    }

    pub(crate) fn set_connected(&self, sid: Option<String>) {
        *self.status.lock() = ConnectionState::Connected;
        *self.sid.lock() = sid;
    }

    /// Mark the connection dead and fail every pending acknowledgement.
    pub(crate) fn set_disconnected(&self) {
        *self.status.lock() = ConnectionState::Disconnected;
        *self.sid.lock() = None;
        let dropped = self.pending_acks.lock().drain().count();
        if dropped > 0 {
            debug!(pending = dropped, "Failing pending acknowledgements");
        }
    }

    pub(crate) fn resolve_ack(&self, id: u64, args: Vec<Value>) {
        match self.pending_acks.lock().remove(&id) {
            Some(tx) => {
                let _ = tx.send(args);
            }
            None => debug!(ack_id = id, "Ack for unknown or expired request"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Opens Socket.IO connections to the realtime server.
#[derive(Debug, Clone)]
pub struct SocketIoTransport {
    config: RealtimeConfig,
}

impl SocketIoTransport {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }
}

impl Transport for SocketIoTransport {
    fn open(
        &self,
        handshake: Handshake,
        tokens: Arc<dyn TokenProvider>,
    ) -> (Arc<dyn Socket>, mpsc::Receiver<SocketEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SocketShared::default());
        shared.set_connecting();

        tokio::spawn(connection_loop(
            self.config.clone(),
            handshake,
            tokens,
            Arc::clone(&shared),
            event_tx,
            command_rx,
        ));

        let socket = SocketIoSocket { command_tx, shared };
        (Arc::new(socket), event_rx)
    }
}

// ---------------------------------------------------------------------------
// Socket handle
// ---------------------------------------------------------------------------

struct SocketIoSocket {
    command_tx: mpsc::UnboundedSender<SocketCommand>,
    shared: Arc<SocketShared>,
}

#[async_trait]
impl Socket for SocketIoSocket {
    fn id(&self) -> Option<String> {
        self.shared.sid.lock().clone()
    }

    fn status(&self) -> ConnectionState {
        *self.shared.status.lock()
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), RealtimeError> {
        let frame = packet::encode_event(event, &payload, None);
        self.command_tx
            .send(SocketCommand::Send(frame))
            .map_err(|_| RealtimeError::Transport("socket is closed".to_string()))
    }

    async fn emit_with_ack(&self, event: &str, payload: Value, timeout: Duration) -> AckReply {
        let id = self.shared.next_ack_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared.pending_acks.lock().insert(id, tx);

        let frame = packet::encode_event(event, &payload, Some(id));
        if self.command_tx.send(SocketCommand::Send(frame)).is_err() {
            self.shared.pending_acks.lock().remove(&id);
            return AckReply::Disconnected;
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(args)) => AckReply::Ack(args),
            Ok(Err(_)) => AckReply::Disconnected,
            Err(_elapsed) => {
                self.shared.pending_acks.lock().remove(&id);
                AckReply::NoAck
            }
        }
    }

    fn disconnect(&self) {
        let _ = self.command_tx.send(SocketCommand::Close);
    }
}
