//! Realtime connection manager.
//!
//! [`RealtimeClient`] owns one logical socket connection. It remembers the
//! channels the application subscribed to, replays them on every
//! (re)connect, and dispatches inbound events to registered listeners.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use insforge_common::ListenerId;

use crate::auth::TokenProvider;
use crate::channel::Channel;
use crate::error::RealtimeError;
use crate::handler::{classify, interpret_subscribe_ack, Inbound};
use crate::registry::{EventCallback, Hooks, ListenerRegistry};
use crate::transport::{resolve_handshake, Socket, SocketEvent, SocketIoTransport, Transport};
use crate::types::{
    events, subscribe_codes, ConnectionState, RealtimeConfig, RealtimeErrorPayload,
    SocketMessage, SubscribeResponse,
};

type ConnectWaiter = oneshot::Sender<Result<(), String>>;

/// Handle to the realtime connection manager. Cheap to clone; clones share
/// one connection.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: RealtimeConfig,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
    /// Serialises `connect()` so only one transport connection is opened.
    connect_lock: tokio::sync::Mutex<()>,
    state: Mutex<State>,
    state_tx: watch::Sender<ConnectionState>,
}

#[derive(Default)]
struct State {
    socket: Option<Arc<dyn Socket>>,
    pump: Option<JoinHandle<()>>,
    connection: ConnectionState,
    socket_id: Option<String>,
    subscribed: HashSet<String>,
    listeners: ListenerRegistry,
    hooks: Hooks,
    /// Resolved by the first `Connected`/`ConnectError` after a `connect()`.
    connect_waiter: Option<ConnectWaiter>,
}

enum Flow {
    Continue,
    Stop,
}

impl RealtimeClient {
    /// Create a client that talks Socket.IO to `config.base_url`.
    pub fn new(config: RealtimeConfig, tokens: impl TokenProvider + 'static) -> Self {
        let transport = Arc::new(SocketIoTransport::new(config.clone()));
        Self::with_transport(config, transport, Arc::new(tokens))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(
        config: RealtimeConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                tokens,
                connect_lock: tokio::sync::Mutex::new(()),
                state: Mutex::new(State::default()),
                state_tx,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Connect to the realtime server. Returns immediately when already
    /// connected; otherwise waits for the first connect or connect-error.
    pub async fn connect(&self) -> Result<(), RealtimeError> {
        let _guard = self.inner.connect_lock.lock().await;

        let pending = {
            let mut state = self.inner.state.lock();
            if state.connection == ConnectionState::Connected {
                return Ok(());
            }
            // A live handle that is still (re)connecting: wait for it.
            match &state.socket {
                Some(socket) if socket.status() != ConnectionState::Disconnected => {
                    let (tx, rx) = oneshot::channel();
                    state.connect_waiter = Some(tx);
                    Some(rx)
                }
                _ => None,
            }
        };

        let waiter = match pending {
            Some(rx) => rx,
            None => self.open_socket().await?,
        };

        match waiter.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(RealtimeError::ConnectionFailed(message)),
            Err(_) => Err(RealtimeError::ConnectionFailed(
                "connection attempt abandoned".to_string(),
            )),
        }
    }

    async fn open_socket(&self) -> Result<oneshot::Receiver<Result<(), String>>, RealtimeError> {
        // Read fresh on every connect; the auth layer may have rotated it.
        let handshake = resolve_handshake(self.inner.tokens.as_ref()).await?;

        let (waiter_tx, waiter_rx) = oneshot::channel();
        let (old_socket, old_pump) = {
            let mut state = self.inner.state.lock();
            let (socket, events) = self
                .inner
                .transport
                .open(handshake, Arc::clone(&self.inner.tokens));
            // The pump blocks on `state` until the new handle is recorded.
            let pump = tokio::spawn(pump_events(
                Arc::downgrade(&self.inner),
                Arc::clone(&socket),
                events,
            ));
            state.connect_waiter = Some(waiter_tx);
            state.socket_id = None;
            self.inner.set_connection(&mut state, ConnectionState::Connecting);
            (state.socket.replace(socket), state.pump.replace(pump))
        };

        if let Some(pump) = old_pump {
            pump.abort();
        }
        if let Some(socket) = old_socket {
            debug!("Replacing stale socket");
            socket.disconnect();
        }

        info!(base_url = %self.inner.config.base_url, "Opening realtime connection");
        Ok(waiter_rx)
    }

    /// Tear down the connection and forget every subscription. Listeners
    /// and hooks are kept. No hooks are notified.
    pub fn disconnect(&self) {
        let (socket, pump) = {
            let mut state = self.inner.state.lock();
            state.subscribed.clear();
            state.socket_id = None;
            state.connect_waiter = None;
            self.inner
                .set_connection(&mut state, ConnectionState::Disconnected);
            (state.socket.take(), state.pump.take())
        };
        if let Some(pump) = pump {
            pump.abort();
        }
        if let Some(socket) = socket {
            socket.disconnect();
            info!("Realtime connection closed");
        }
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Subscribe to `channel`, connecting first if needed. Failures are
    /// reported in the returned value, never as an error.
    pub async fn subscribe(&self, channel: &str) -> SubscribeResponse {
        if self.inner.state.lock().subscribed.contains(channel) {
            return SubscribeResponse::success(channel);
        }

        if !self.is_connected() {
            if let Err(e) = self.connect().await {
                warn!(channel = %channel, error = %e, "Subscribe could not connect");
                return SubscribeResponse::failure(
                    channel,
                    subscribe_codes::CONNECTION_FAILED,
                    e.to_string(),
                );
            }
        }

        let Some(socket) = self.inner.state.lock().socket.clone() else {
            return SubscribeResponse::failure(
                channel,
                subscribe_codes::NO_SOCKET,
                "no socket after connect",
            );
        };

        let reply = socket
            .emit_with_ack(
                events::SUBSCRIBE,
                json!({ "channel": channel }),
                self.inner.config.ack_timeout,
            )
            .await;
        let mut response = interpret_subscribe_ack(channel, reply);

        if response.is_ok() {
            let mut state = self.inner.state.lock();
            if is_current(&state, &socket) {
                state.subscribed.insert(channel.to_string());
            } else {
                response = SubscribeResponse::failure(
                    channel,
                    subscribe_codes::DISCONNECTED,
                    "connection was closed while subscribing",
                );
            }
        }

        match &response {
            SubscribeResponse::Success { .. } => info!(channel = %channel, "Subscribed"),
            SubscribeResponse::Failure { code, message, .. } => {
                warn!(channel = %channel, code = %code, message = %message, "Subscribe failed")
            }
        }
        response
    }

    /// Forget `channel` and tell the server if connected. Never fails.
    pub fn unsubscribe(&self, channel: &str) {
        let socket = {
            let mut state = self.inner.state.lock();
            state.subscribed.remove(channel);
            match state.connection {
                ConnectionState::Connected => state.socket.clone(),
                _ => None,
            }
        };
        if let Some(socket) = socket {
            if let Err(e) = socket.emit(events::UNSUBSCRIBE, json!({ "channel": channel })) {
                debug!(channel = %channel, error = %e, "Unsubscribe not sent");
            }
        }
        debug!(channel = %channel, "Unsubscribed");
    }

    /// Broadcast `event` with `payload` to everyone on `channel`.
    pub fn publish(&self, channel: &str, event: &str, payload: Value) -> Result<(), RealtimeError> {
        let socket = {
            let state = self.inner.state.lock();
            match (&state.connection, &state.socket) {
                (ConnectionState::Connected, Some(socket)) => Arc::clone(socket),
                _ => return Err(RealtimeError::NotConnected),
            }
        };
        socket.emit(
            events::PUBLISH,
            json!({ "channel": channel, "event": event, "payload": payload }),
        )
    }

    /// A filtered view scoped to one channel.
    pub fn channel(&self, name: &str) -> Channel {
        Channel::new(name, self.clone())
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Listen for a custom event. `"*"` receives every custom event.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&SocketMessage) + Send + Sync + 'static,
    {
        self.on_callback(event, Arc::new(callback))
    }

    pub(crate) fn on_callback(&self, event: &str, callback: EventCallback) -> ListenerId {
        self.inner.state.lock().listeners.add(event, callback)
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn off(&self, event: &str, id: &ListenerId) -> bool {
        self.inner.state.lock().listeners.remove(event, id)
    }

    pub fn on_connect<F>(&self, hook: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.add_connect(Arc::new(hook))
    }

    /// Called with the reason whenever an established connection drops.
    pub fn on_disconnect<F>(&self, hook: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.add_disconnect(Arc::new(hook))
    }

    /// Called for every `realtime:error` pushed by the server.
    pub fn on_error<F>(&self, hook: F) -> ListenerId
    where
        F: Fn(&RealtimeErrorPayload) + Send + Sync + 'static,
    {
        self.inner.state.lock().hooks.add_error(Arc::new(hook))
    }

    pub fn on_connect_error<F>(&self, hook: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner
            .state
            .lock()
            .hooks
            .add_connect_error(Arc::new(hook))
    }

    pub fn remove_hook(&self, id: &ListenerId) -> bool {
        self.inner.state.lock().hooks.remove(id)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Server-assigned socket id while connected.
    pub fn socket_id(&self) -> Option<String> {
        self.inner.state.lock().socket_id.clone()
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.inner.state.lock().subscribed.contains(channel)
    }

    /// Currently subscribed channel names, sorted.
    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> =
            self.inner.state.lock().subscribed.iter().cloned().collect();
        channels.sort();
        channels
    }

    /// Observe connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("base_url", &self.inner.config.base_url)
            .field("state", &self.connection_state())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Inbound event handling
// ---------------------------------------------------------------------------

fn is_current(state: &State, socket: &Arc<dyn Socket>) -> bool {
    state
        .socket
        .as_ref()
        .is_some_and(|current| Arc::ptr_eq(current, socket))
}

async fn pump_events(
    inner: Weak<Inner>,
    socket: Arc<dyn Socket>,
    mut events: mpsc::Receiver<SocketEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(client) = inner.upgrade() else {
            return;
        };
        if let Flow::Stop = client.handle_event(&socket, event) {
            return;
        }
    }
    if let Some(client) = inner.upgrade() {
        client.socket_closed(&socket);
    }
}

impl Inner {
    fn set_connection(&self, state: &mut State, next: ConnectionState) {
        if state.connection != next {
            debug!(from = %state.connection, to = %next, "Connection state changed");
            state.connection = next;
            self.state_tx.send_replace(next);
        }
    }

    fn handle_event(&self, socket: &Arc<dyn Socket>, event: SocketEvent) -> Flow {
        match event {
            SocketEvent::Connected { sid } => self.on_connected(socket, sid),
            SocketEvent::ConnectError(message) => self.on_connect_error(socket, message),
            SocketEvent::Disconnected { reason } => self.on_disconnected(socket, reason),
            SocketEvent::Event { name, args } => {
                self.dispatch(&name, &args);
                Flow::Continue
            }
        }
    }

    fn on_connected(&self, socket: &Arc<dyn Socket>, sid: Option<String>) -> Flow {
        let (channels, waiter, hooks) = {
            let mut state = self.state.lock();
            if !is_current(&state, socket) {
                return Flow::Stop;
            }
            state.socket_id = sid;
            self.set_connection(&mut state, ConnectionState::Connected);
            let channels: Vec<String> = state.subscribed.iter().cloned().collect();
            (channels, state.connect_waiter.take(), state.hooks.connect())
        };

        info!(replayed = channels.len(), "Realtime connected");
        for channel in &channels {
            if let Err(e) = socket.emit(events::SUBSCRIBE, json!({ "channel": channel })) {
                warn!(channel = %channel, error = %e, "Failed to replay subscription");
            }
        }

        if let Some(waiter) = waiter {
            let _ = waiter.send(Ok(()));
        }
        for hook in hooks {
            hook();
        }
        Flow::Continue
    }

    fn on_connect_error(&self, socket: &Arc<dyn Socket>, message: String) -> Flow {
        let (waiter, hooks) = {
            let mut state = self.state.lock();
            if !is_current(&state, socket) {
                return Flow::Stop;
            }
            let waiter = state.connect_waiter.take();
            if waiter.is_some() {
                // A failed connect() leaves nothing running in the background.
                state.socket = None;
                state.pump = None;
                state.socket_id = None;
                self.set_connection(&mut state, ConnectionState::Disconnected);
            }
            (waiter, state.hooks.connect_error())
        };

        warn!(message = %message, "Realtime connect error");
        let stop = waiter.is_some();
        if let Some(waiter) = waiter {
            socket.disconnect();
            let _ = waiter.send(Err(message.clone()));
        }
        for hook in hooks {
            hook(&message);
        }
        if stop {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn on_disconnected(&self, socket: &Arc<dyn Socket>, reason: String) -> Flow {
        let hooks = {
            let mut state = self.state.lock();
            if !is_current(&state, socket) {
                return Flow::Stop;
            }
            state.socket_id = None;
            self.set_connection(&mut state, ConnectionState::Disconnected);
            state.hooks.disconnect()
        };

        info!(reason = %reason, "Realtime disconnected");
        for hook in hooks {
            hook(&reason);
        }
        Flow::Continue
    }

    fn dispatch(&self, name: &str, args: &[Value]) {
        match classify(name, args) {
            Inbound::Message(message) => {
                let callbacks = self.state.lock().listeners.matching(name);
                debug!(event = %name, listeners = callbacks.len(), "Dispatching event");
                for callback in callbacks {
                    callback(&message);
                }
            }
            Inbound::ServerError(payload) => {
                warn!(code = %payload.code, message = %payload.message, "Realtime server error");
                let hooks = self.state.lock().hooks.error();
                for hook in hooks {
                    hook(&payload);
                }
            }
            Inbound::Reserved => debug!(event = %name, "Ignoring reserved event"),
            Inbound::Malformed => debug!(event = %name, "Dropping malformed event"),
        }
    }

    /// The socket's event stream ended.
    fn socket_closed(&self, socket: &Arc<dyn Socket>) {
        let waiter = {
            let mut state = self.state.lock();
            if !is_current(&state, socket) {
                return;
            }
            state.socket_id = None;
            self.set_connection(&mut state, ConnectionState::Disconnected);
            state.connect_waiter.take()
        };
        if let Some(waiter) = waiter {
            let _ = waiter.send(Err("connection closed".to_string()));
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(pump) = state.pump.take() {
            pump.abort();
        }
        if let Some(socket) = state.socket.take() {
            socket.disconnect();
        }
    }
}
