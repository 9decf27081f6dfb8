//! Background WebSocket connection loop with auto-reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::packet::{self, EnginePacket, SocketPacket};
use super::socketio::{SocketCommand, SocketShared};
use super::{resolve_handshake, Handshake, SocketEvent};
use crate::auth::TokenProvider;
use crate::types::RealtimeConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Liveness window used until the server's `open` packet says otherwise.
const DEFAULT_LIVENESS: Duration = Duration::from_secs(45);

/// How a single connection attempt ended.
#[derive(Debug)]
enum SessionOutcome {
    /// Local `disconnect()`.
    Closed,
    /// The server refused the namespace handshake.
    Rejected(String),
    /// The server closed the namespace on purpose.
    ServerDisconnect,
    /// An established connection dropped.
    Lost(String),
    /// The attempt failed before the handshake completed.
    Failed(String),
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Next backoff step, capped at `max_secs`.
fn next_delay(current_secs: u64, max_secs: u64) -> u64 {
    current_secs.saturating_mul(2).min(max_secs.max(1))
}

/// Background task owning the WebSocket for one socket handle.
///
/// `first` is the handshake for the initial attempt; every reconnect asks
/// `tokens` for the current token.
pub(crate) async fn connection_loop(
    config: RealtimeConfig,
    first: Handshake,
    tokens: Arc<dyn TokenProvider>,
    shared: Arc<SocketShared>,
    event_tx: mpsc::Sender<SocketEvent>,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
) {
    let url = config.socket_url();
    let mut reconnect_delay = config.reconnect_delay_secs.max(1);
    let mut first = Some(first);

    loop {
        shared.set_connecting();

        let handshake = match first.take() {
            Some(handshake) => Ok(handshake),
            None => resolve_handshake(tokens.as_ref()).await,
        };

        let outcome = match handshake {
            Ok(handshake) => {
                info!(url = %url.split('?').next().unwrap_or(""), "Connecting to realtime server");
                connect_once(&config, &url, &handshake, &shared, &event_tx, &mut command_rx).await
            }
            Err(e) => {
                warn!(error = %e, "Could not resolve access token for reconnect");
                SessionOutcome::Failed(e.to_string())
            }
        };

        shared.set_disconnected();

        match outcome {
            SessionOutcome::Closed => {
                debug!("Socket closed locally");
                return;
            }
            SessionOutcome::Rejected(message) => {
                warn!(message = %message, "Realtime server rejected the connection");
                let _ = event_tx.send(SocketEvent::ConnectError(message)).await;
                return;
            }
            SessionOutcome::ServerDisconnect => {
                info!("Realtime server closed the namespace");
                let _ = event_tx
                    .send(SocketEvent::Disconnected {
                        reason: "io server disconnect".to_string(),
                    })
                    .await;
                return;
            }
            SessionOutcome::Lost(reason) => {
                info!(reason = %reason, "Realtime connection lost");
                reconnect_delay = config.reconnect_delay_secs.max(1);
                if event_tx
                    .send(SocketEvent::Disconnected { reason })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            SessionOutcome::Failed(message) => {
                if event_tx
                    .send(SocketEvent::ConnectError(message))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        if !config.reconnect {
            return;
        }

        // Exponential backoff, abandoned early on a local close.
        info!(
            delay = reconnect_delay,
            "Reconnecting in {} seconds", reconnect_delay
        );
        let backoff = tokio::time::sleep(Duration::from_secs(reconnect_delay));
        tokio::pin!(backoff);
        loop {
            tokio::select! {
                _ = &mut backoff => break,
                cmd = command_rx.recv() => match cmd {
                    Some(SocketCommand::Send(_)) => {
                        debug!("Dropping frame while disconnected");
                    }
                    Some(SocketCommand::Close) | None => return,
                },
            }
        }
        reconnect_delay = next_delay(reconnect_delay, config.max_reconnect_delay_secs);
    }
}

/// Open the WebSocket and run one session on it.
async fn connect_once(
    config: &RealtimeConfig,
    url: &str,
    handshake: &Handshake,
    shared: &SocketShared,
    event_tx: &mpsc::Sender<SocketEvent>,
    command_rx: &mut mpsc::UnboundedReceiver<SocketCommand>,
) -> SessionOutcome {
    match tokio::time::timeout(config.connect_timeout, tokio_tungstenite::connect_async(url)).await {
        Ok(Ok((ws_stream, _))) => run_session(ws_stream, handshake, shared, event_tx, command_rx).await,
        Ok(Err(e)) => {
            error!(error = %e, "Failed to connect to realtime server");
            SessionOutcome::Failed(format!("connection failed: {e}"))
        }
        Err(_elapsed) => {
            error!(
                timeout_secs = config.connect_timeout.as_secs(),
                "WebSocket connection timed out"
            );
            SessionOutcome::Failed(format!(
                "connection timed out after {}s",
                config.connect_timeout.as_secs()
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Drive one WebSocket until it ends.
async fn run_session(
    ws_stream: WsStream,
    handshake: &Handshake,
    shared: &SocketShared,
    event_tx: &mpsc::Sender<SocketEvent>,
    command_rx: &mut mpsc::UnboundedReceiver<SocketCommand>,
) -> SessionOutcome {
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut joined = false;
    let mut liveness = DEFAULT_LIVENESS;
    let mut last_seen = Instant::now();

    let dropped = |joined: bool, reason: &str| {
        if joined {
            SessionOutcome::Lost(reason.to_string())
        } else {
            SessionOutcome::Failed(format!("{reason} before handshake completed"))
        }
    };

    loop {
        tokio::select! {
            frame = ws_read.next() => {
                last_seen = Instant::now();
                let text = match frame {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | None => return dropped(joined, "transport close"),
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        return dropped(joined, "transport error");
                    }
                    Some(Ok(_)) => continue,
                };

                let decoded = match packet::decode(text.as_str()) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        debug!(error = %e, "Undecodable frame from realtime server");
                        continue;
                    }
                };

                match decoded {
                    EnginePacket::Open(info) => {
                        liveness = Duration::from_millis(info.liveness_ms());
                        debug!(engine_sid = %info.sid, "Engine.IO session opened");
                        let connect = packet::encode_connect(handshake);
                        if ws_write.send(WsMessage::Text(connect.into())).await.is_err() {
                            return dropped(joined, "transport error");
                        }
                    }
                    EnginePacket::Ping => {
                        if ws_write.send(WsMessage::Text(packet::PONG.to_string().into())).await.is_err() {
                            return dropped(joined, "transport error");
                        }
                    }
                    EnginePacket::Close => return dropped(joined, "transport close"),
                    EnginePacket::Pong | EnginePacket::Upgrade | EnginePacket::Noop => {}
                    EnginePacket::Message(message) => match message {
                        SocketPacket::Connect { sid } => {
                            joined = true;
                            shared.set_connected(sid.clone());
                            info!("Realtime namespace connected");
                            let _ = event_tx.send(SocketEvent::Connected { sid }).await;
                        }
                        SocketPacket::ConnectError { message } => {
                            return SessionOutcome::Rejected(message);
                        }
                        SocketPacket::Disconnect => return SessionOutcome::ServerDisconnect,
                        SocketPacket::Event { name, args, ack_id } => {
                            if let Some(id) = ack_id {
                                debug!(event = %name, ack_id = id, "Server requested an ack; not supported");
                            }
                            let _ = event_tx.send(SocketEvent::Event { name, args }).await;
                        }
                        SocketPacket::Ack { id, args } => shared.resolve_ack(id, args),
                        SocketPacket::Binary => {
                            debug!("Ignoring binary Socket.IO packet");
                        }
                    },
                }
            }
            cmd = command_rx.recv() => match cmd {
                Some(SocketCommand::Send(frame)) => {
                    if !joined {
                        debug!("Dropping frame sent before handshake");
                        continue;
                    }
                    if let Err(e) = ws_write.send(WsMessage::Text(frame.into())).await {
                        warn!(error = %e, "Failed to write frame");
                        return dropped(joined, "transport error");
                    }
                }
                Some(SocketCommand::Close) | None => {
                    let _ = ws_write.send(WsMessage::Text(packet::DISCONNECT.to_string().into())).await;
                    let _ = ws_write.close().await;
                    return SessionOutcome::Closed;
                }
            },
            _ = tokio::time::sleep_until(last_seen + liveness) => {
                warn!(liveness_ms = liveness.as_millis() as u64, "No traffic from realtime server");
                return dropped(joined, "ping timeout");
            }
        }
    }
}
