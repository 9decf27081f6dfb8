//! Channel-scoped view over a [`RealtimeClient`].

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use insforge_common::ListenerId;

use crate::client::RealtimeClient;
use crate::error::RealtimeError;
use crate::types::{SocketMessage, SubscribeResponse};

/// A named channel handle.
///
/// Listeners added through a handle only see messages whose `meta.channel`
/// names this channel, and are removed again by [`Channel::unsubscribe`].
/// Listeners registered elsewhere are left alone.
pub struct Channel {
    name: String,
    client: RealtimeClient,
    listeners: Mutex<Vec<(String, ListenerId)>>,
}

impl Channel {
    pub(crate) fn new(name: &str, client: RealtimeClient) -> Self {
        Self {
            name: name.to_string(),
            client,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn subscribe(&self) -> SubscribeResponse {
        self.client.subscribe(&self.name).await
    }

    /// Drop this handle's listeners and unsubscribe the channel.
    pub fn unsubscribe(&self) {
        let owned = std::mem::take(&mut *self.listeners.lock());
        for (event, id) in owned {
            self.client.off(&event, &id);
        }
        self.client.unsubscribe(&self.name);
    }

    pub fn is_subscribed(&self) -> bool {
        self.client.is_subscribed(&self.name)
    }

    /// Listen for `event` on this channel; `"*"` matches every event.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&SocketMessage) + Send + Sync + 'static,
    {
        let channel = self.name.clone();
        let id = self.client.on_callback(
            event,
            Arc::new(move |message: &SocketMessage| {
                if message.is_for_channel(&channel) {
                    callback(message);
                }
            }),
        );
        self.listeners.lock().push((event.to_string(), id.clone()));
        id
    }

    pub fn off(&self, event: &str, id: &ListenerId) -> bool {
        self.listeners
            .lock()
            .retain(|(e, owned)| !(e == event && owned == id));
        self.client.off(event, id)
    }

    /// Publish `event` to this channel.
    pub fn broadcast(&self, event: &str, payload: Value) -> Result<(), RealtimeError> {
        self.client.publish(&self.name, event, payload)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::auth::StaticToken;
    use crate::transport::mock::MockTransport;
    use crate::types::{events, RealtimeConfig};

    fn client() -> (RealtimeClient, MockTransport) {
        let transport = MockTransport::new();
        let client = RealtimeClient::with_transport(
            RealtimeConfig::new("http://localhost:7130"),
            Arc::new(transport.clone()),
            Arc::new(StaticToken::new("jwt")),
        );
        (client, transport)
    }

    fn body(channel: &str, id: &str) -> Value {
        json!({
            "meta": {
                "channel": channel,
                "messageId": id,
                "senderType": "system",
                "timestamp": "2025-01-02T03:04:05Z"
            }
        })
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for callback")
            .expect("callback channel closed")
    }

    fn forward(tx: &mpsc::UnboundedSender<String>) -> impl Fn(&SocketMessage) + Send + Sync {
        let tx = tx.clone();
        move |message: &SocketMessage| {
            let _ = tx.send(message.meta.message_id.clone());
        }
    }

    #[tokio::test]
    async fn listeners_only_see_their_channel() {
        let (client, transport) = client();
        let orders = client.channel("orders:1");
        let (tx, mut rx) = mpsc::unbounded_channel();
        orders.on("updated", forward(&tx));
        assert!(orders.subscribe().await.is_ok());

        let socket = transport.socket();
        socket.push_event("updated", body("orders:2", "other"));
        socket.push_event("updated", body("orders:1", "bare"));
        socket.push_event("updated", body("realtime:orders:1", "prefixed"));
        socket.push_event("created", body("orders:1", "wrong-event"));
        socket.push_event("updated", json!({"meta": {"messageId": "x", "senderType": "s", "timestamp": "t"}}));
        socket.push_event("updated", body("orders:1", "last"));

        assert_eq!(recv(&mut rx).await, "bare");
        assert_eq!(recv(&mut rx).await, "prefixed");
        assert_eq!(recv(&mut rx).await, "last");
    }

    #[tokio::test]
    async fn wildcard_listener_sees_every_event_of_the_channel() {
        let (client, transport) = client();
        let room = client.channel("room");
        let (tx, mut rx) = mpsc::unbounded_channel();
        room.on(events::WILDCARD, forward(&tx));
        client.connect().await.unwrap();

        let socket = transport.socket();
        socket.push_event("joined", body("room", "1"));
        socket.push_event("left", body("lobby", "2"));
        socket.push_event("typing", body("room", "3"));

        assert_eq!(recv(&mut rx).await, "1");
        assert_eq!(recv(&mut rx).await, "3");
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_own_listeners() {
        let (client, transport) = client();
        let first = client.channel("lobby");
        let second = client.channel("lobby");
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();
        let (direct_tx, mut direct_rx) = mpsc::unbounded_channel();
        first.on("chat", forward(&first_tx));
        second.on("chat", forward(&second_tx));
        client.on("chat", forward(&direct_tx));
        assert!(first.subscribe().await.is_ok());
        assert!(first.is_subscribed());

        first.unsubscribe();

        assert!(!second.is_subscribed());
        let socket = transport.socket();
        assert_eq!(socket.emitted_named(events::UNSUBSCRIBE).len(), 1);
        socket.push_event("chat", body("lobby", "m1"));
        assert_eq!(recv(&mut second_rx).await, "m1");
        assert_eq!(recv(&mut direct_rx).await, "m1");
        assert!(first_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn off_removes_a_single_listener() {
        let (client, transport) = client();
        let lobby = client.channel("lobby");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (sentinel_tx, mut sentinel_rx) = mpsc::unbounded_channel();
        let id = lobby.on("chat", forward(&tx));
        lobby.on("done", forward(&sentinel_tx));
        client.connect().await.unwrap();

        assert!(lobby.off("chat", &id));
        let socket = transport.socket();
        socket.push_event("chat", body("lobby", "m1"));
        socket.push_event("done", body("lobby", "end"));

        assert_eq!(recv(&mut sentinel_rx).await, "end");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_publishes_to_channel() {
        let (client, transport) = client();
        let lobby = client.channel("lobby");
        assert!(matches!(
            lobby.broadcast("chat", json!({"text": "hi"})),
            Err(RealtimeError::NotConnected)
        ));

        client.connect().await.unwrap();
        lobby.broadcast("chat", json!({"text": "hi"})).unwrap();

        let sent = transport.socket().emitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event, events::PUBLISH);
        assert_eq!(
            sent[0].payload,
            json!({"channel": "lobby", "event": "chat", "payload": {"text": "hi"}})
        );
    }
}
