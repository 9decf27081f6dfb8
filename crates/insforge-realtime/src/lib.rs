//! Realtime client for the InsForge backend.
//!
//! Keeps one Socket.IO connection to the realtime server, tracks which
//! channels the application is subscribed to, replays those subscriptions
//! after every reconnect, and fans inbound events out to registered
//! listeners.
//!
//! ```rust,no_run
//! use insforge_realtime::{RealtimeClient, RealtimeConfig, StaticToken};
//!
//! # async fn run() -> Result<(), insforge_realtime::RealtimeError> {
//! let config = RealtimeConfig::new("https://your-app.insforge.app");
//! let client = RealtimeClient::new(config, StaticToken::new("user-jwt"));
//!
//! client.connect().await?;
//! let orders = client.channel("orders:1");
//! orders.on("updated", |message| println!("{:?}", message.payload));
//! if orders.subscribe().await.is_ok() {
//!     orders.broadcast("viewed", serde_json::json!({ "by": "me" }))?;
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod channel;
mod client;
mod error;
mod handler;
mod registry;
pub mod transport;
mod types;

pub use auth::{
    bearer_from_headers, token_fn, FnTokenProvider, HeaderTokenProvider, StaticToken,
    TokenProvider, WithFallback,
};
pub use channel::Channel;
pub use client::RealtimeClient;
pub use error::RealtimeError;
pub use insforge_common::ListenerId;
pub use registry::EventCallback;
pub use types::{
    events, subscribe_codes, ConnectionState, RealtimeConfig, RealtimeErrorPayload,
    SocketMessage, SocketMessageMeta, SubscribeResponse,
};
