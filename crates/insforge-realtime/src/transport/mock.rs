//! In-memory transport for client tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};

use super::{AckReply, Handshake, Socket, SocketEvent, Transport};
use crate::auth::TokenProvider;
use crate::error::RealtimeError;
use crate::types::ConnectionState;

/// What `open` does with a new socket.
#[derive(Debug, Clone)]
pub(crate) enum OpenBehavior {
    /// Report `Connected` straight away.
    Connect,
    /// Report `ConnectError` with this message.
    Reject(String),
    /// Stay connecting until the test drives the socket.
    Manual,
}

/// How `emit_with_ack` answers.
#[derive(Debug, Clone)]
pub(crate) enum AckScript {
    Reply(Value),
    /// Never answer; the caller's timeout fires.
    Never,
    /// Block until the socket drops.
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Emitted {
    pub event: String,
    pub payload: Value,
    pub with_ack: bool,
}

struct MockConfig {
    open: Mutex<OpenBehavior>,
    ack: Mutex<AckScript>,
}

#[derive(Clone)]
pub(crate) struct MockTransport {
    config: Arc<MockConfig>,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    sockets: Arc<Mutex<Vec<Arc<MockSocket>>>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            config: Arc::new(MockConfig {
                open: Mutex::new(OpenBehavior::Connect),
                ack: Mutex::new(AckScript::Reply(json!({"ok": true}))),
            }),
            handshakes: Arc::default(),
            sockets: Arc::default(),
        }
    }

    pub(crate) fn set_open(&self, behavior: OpenBehavior) {
        *self.config.open.lock() = behavior;
    }

    pub(crate) fn set_ack(&self, script: AckScript) {
        *self.config.ack.lock() = script;
    }

    pub(crate) fn open_count(&self) -> usize {
        self.sockets.lock().len()
    }

    pub(crate) fn handshakes(&self) -> Vec<Handshake> {
        self.handshakes.lock().clone()
    }

    /// Most recently opened socket.
    pub(crate) fn socket(&self) -> Arc<MockSocket> {
        self.sockets
            .lock()
            .last()
            .cloned()
            .expect("no socket has been opened")
    }
}

impl Transport for MockTransport {
    fn open(
        &self,
        handshake: Handshake,
        _tokens: Arc<dyn TokenProvider>,
    ) -> (Arc<dyn Socket>, mpsc::Receiver<SocketEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        self.handshakes.lock().push(handshake);

        let index = self.sockets.lock().len() + 1;
        let socket = Arc::new(MockSocket {
            config: Arc::clone(&self.config),
            sid: format!("mock-sid-{index}"),
            status: Mutex::new(ConnectionState::Connecting),
            emitted: Mutex::new(Vec::new()),
            event_tx,
            alive: watch::channel(false).0,
            closed: AtomicBool::new(false),
            acks_waiting: AtomicUsize::new(0),
        });

        match self.config.open.lock().clone() {
            OpenBehavior::Connect => socket.mark_connected(),
            OpenBehavior::Reject(message) => socket.mark_rejected(message),
            OpenBehavior::Manual => {}
        }

        self.sockets.lock().push(Arc::clone(&socket));
        (socket, event_rx)
    }
}

pub(crate) struct MockSocket {
    config: Arc<MockConfig>,
    sid: String,
    status: Mutex<ConnectionState>,
    emitted: Mutex<Vec<Emitted>>,
    event_tx: mpsc::Sender<SocketEvent>,
    alive: watch::Sender<bool>,
    closed: AtomicBool,
    acks_waiting: AtomicUsize,
}

impl MockSocket {
    fn mark_connected(&self) {
        *self.status.lock() = ConnectionState::Connected;
        self.alive.send_replace(true);
        let _ = self.event_tx.try_send(SocketEvent::Connected {
            sid: Some(self.sid.clone()),
        });
    }

    fn mark_rejected(&self, message: String) {
        *self.status.lock() = ConnectionState::Disconnected;
        let _ = self.event_tx.try_send(SocketEvent::ConnectError(message));
    }

    pub(crate) fn emitted(&self) -> Vec<Emitted> {
        self.emitted.lock().clone()
    }

    pub(crate) fn emitted_named(&self, event: &str) -> Vec<Emitted> {
        self.emitted
            .lock()
            .iter()
            .filter(|e| e.event == event)
            .cloned()
            .collect()
    }

    pub(crate) fn clear_emitted(&self) {
        self.emitted.lock().clear();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Complete a handshake left pending by `OpenBehavior::Manual`, or
    /// simulate a successful reconnect after `drop_connection`.
    pub(crate) fn accept(&self) {
        self.mark_connected();
    }

    /// Lose the connection without closing the handle.
    pub(crate) fn drop_connection(&self, reason: &str) {
        *self.status.lock() = ConnectionState::Connecting;
        self.alive.send_replace(false);
        let _ = self.event_tx.try_send(SocketEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Deliver a server event.
    pub(crate) fn push_event(&self, name: &str, payload: Value) {
        let _ = self.event_tx.try_send(SocketEvent::Event {
            name: name.to_string(),
            args: vec![payload],
        });
    }

    /// Wait until an `emit_with_ack` call is parked on this socket.
    pub(crate) async fn wait_for_pending_ack(&self) {
        for _ in 0..1000 {
            if self.acks_waiting.load(Ordering::SeqCst) > 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("no acknowledgement request arrived");
    }
}

#[async_trait]
impl Socket for MockSocket {
    fn id(&self) -> Option<String> {
        (*self.status.lock() == ConnectionState::Connected).then(|| self.sid.clone())
    }

    fn status(&self) -> ConnectionState {
        *self.status.lock()
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), RealtimeError> {
        if self.is_closed() {
            return Err(RealtimeError::Transport("socket is closed".into()));
        }
        self.emitted.lock().push(Emitted {
            event: event.to_string(),
            payload,
            with_ack: false,
        });
        Ok(())
    }

    async fn emit_with_ack(&self, event: &str, payload: Value, timeout: Duration) -> AckReply {
        self.emitted.lock().push(Emitted {
            event: event.to_string(),
            payload,
            with_ack: true,
        });

        let script = self.config.ack.lock().clone();
        match script {
            AckScript::Reply(value) => AckReply::Ack(vec![value]),
            AckScript::Never => {
                self.acks_waiting.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(timeout).await;
                self.acks_waiting.fetch_sub(1, Ordering::SeqCst);
                AckReply::NoAck
            }
            AckScript::Hang => {
                let mut alive = self.alive.subscribe();
                self.acks_waiting.fetch_add(1, Ordering::SeqCst);
                while *alive.borrow_and_update() {
                    if alive.changed().await.is_err() {
                        break;
                    }
                }
                self.acks_waiting.fetch_sub(1, Ordering::SeqCst);
                AckReply::Disconnected
            }
        }
    }

    fn disconnect(&self) {
        self.closed.store(true, Ordering::SeqCst);
        *self.status.lock() = ConnectionState::Disconnected;
        self.alive.send_replace(false);
    }
}
