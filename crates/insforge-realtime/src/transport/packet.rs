//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Only the subset used over a WebSocket-only connection is handled.
//! Binary packets are recognised and skipped.

use serde::Deserialize;
use serde_json::Value;

use super::Handshake;

pub(crate) const PONG: &str = "3";
pub(crate) const DISCONNECT: &str = "41";

/// Engine.IO `open` packet payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenInfo {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl OpenInfo {
    /// Silence longer than this means the server is gone.
    pub fn liveness_ms(&self) -> u64 {
        self.ping_interval.saturating_add(self.ping_timeout)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SocketPacket {
    Connect {
        sid: Option<String>,
    },
    Disconnect,
    Event {
        name: String,
        args: Vec<Value>,
        ack_id: Option<u64>,
    },
    Ack {
        id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        message: String,
    },
    Binary,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum PacketError {
    #[error("empty frame")]
    Empty,

    #[error("unknown packet type '{0}'")]
    UnknownType(char),

    #[error("malformed packet: {0}")]
    Malformed(&'static str),

    #[error("invalid packet json: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

pub(crate) fn decode(frame: &str) -> Result<EnginePacket, PacketError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let body = chars.as_str();

    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => Ok(EnginePacket::Message(decode_socket_packet(body)?)),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(PacketError::UnknownType(other)),
    }
}

fn decode_socket_packet(body: &str) -> Result<SocketPacket, PacketError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let mut rest = chars.as_str();

    // Namespace other than "/" is written as "/nsp," before the payload.
    if rest.starts_with('/') {
        rest = match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        };
    }

    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let ack_id = if digits > 0 {
        Some(
            rest[..digits]
                .parse::<u64>()
                .map_err(|_| PacketError::Malformed("ack id out of range"))?,
        )
    } else {
        None
    };
    let data = &rest[digits..];

    match kind {
        '0' => {
            let sid = if data.is_empty() {
                None
            } else {
                serde_json::from_str::<Value>(data)?
                    .get("sid")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            Ok(SocketPacket::Connect { sid })
        }
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let mut items: Vec<Value> = serde_json::from_str(data)?;
            if items.is_empty() {
                return Err(PacketError::Malformed("event without name"));
            }
            let name = match items.remove(0) {
                Value::String(name) => name,
                _ => return Err(PacketError::Malformed("event name is not a string")),
            };
            Ok(SocketPacket::Event {
                name,
                args: items,
                ack_id,
            })
        }
        '3' => {
            let id = ack_id.ok_or(PacketError::Malformed("ack without id"))?;
            let args: Vec<Value> = serde_json::from_str(data)?;
            Ok(SocketPacket::Ack { id, args })
        }
        '4' => {
            let message = match serde_json::from_str::<Value>(data) {
                Ok(Value::String(s)) => s,
                Ok(value) => value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("connection rejected")
                    .to_string(),
                Err(_) => "connection rejected".to_string(),
            };
            Ok(SocketPacket::ConnectError { message })
        }
        '5' | '6' => Ok(SocketPacket::Binary),
        other => Err(PacketError::UnknownType(other)),
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Namespace CONNECT carrying the handshake as the auth object.
pub(crate) fn encode_connect(handshake: &Handshake) -> String {
    if handshake.is_empty() {
        return "40".to_string();
    }
    match serde_json::to_string(handshake) {
        Ok(auth) => format!("40{auth}"),
        Err(_) => "40".to_string(),
    }
}

pub(crate) fn encode_event(event: &str, payload: &Value, ack_id: Option<u64>) -> String {
    let body = Value::Array(vec![Value::String(event.to_string()), payload.clone()]);
    match ack_id {
        Some(id) => format!("42{id}{body}"),
        None => format!("42{body}"),
    }
}
