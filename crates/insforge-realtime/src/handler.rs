//! Classification of inbound events and subscribe acknowledgements.

use serde_json::Value;
use tracing::debug;

use crate::transport::AckReply;
use crate::types::{
    events, subscribe_codes, RealtimeErrorPayload, SocketMessage, SocketMessageMeta,
    SubscribeResponse,
};

/// What an inbound event means to the client.
#[derive(Debug, PartialEq)]
pub(crate) enum Inbound {
    /// `realtime:error` pushed by the server.
    ServerError(RealtimeErrorPayload),
    /// A custom event for the listener registry.
    Message(SocketMessage),
    /// Lifecycle or control-plane name; handled elsewhere.
    Reserved,
    /// Missing or incomplete `meta`; dropped.
    Malformed,
}

pub(crate) fn is_reserved(name: &str) -> bool {
    events::RESERVED.contains(&name) || name.starts_with(events::CONTROL_PREFIX)
}

pub(crate) fn classify(name: &str, args: &[Value]) -> Inbound {
    if name == events::ERROR {
        return match args
            .first()
            .and_then(|v| serde_json::from_value::<RealtimeErrorPayload>(v.clone()).ok())
        {
            Some(payload) => Inbound::ServerError(payload),
            None => Inbound::Malformed,
        };
    }
    if is_reserved(name) {
        return Inbound::Reserved;
    }
    match args.first().and_then(parse_socket_message) {
        Some(message) => Inbound::Message(message),
        None => Inbound::Malformed,
    }
}

/// Split an event object into its `meta` and the remaining keys.
pub(crate) fn parse_socket_message(value: &Value) -> Option<SocketMessage> {
    let object = value.as_object()?;
    let meta: SocketMessageMeta = serde_json::from_value(object.get("meta")?.clone()).ok()?;
    let payload = object
        .iter()
        .filter(|(key, _)| key.as_str() != "meta")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Some(SocketMessage { meta, payload })
}

/// Turn the reply to `realtime:subscribe` into a response value.
pub(crate) fn interpret_subscribe_ack(channel: &str, reply: AckReply) -> SubscribeResponse {
    let args = match reply {
        AckReply::Ack(args) => args,
        AckReply::NoAck => {
            return SubscribeResponse::failure(
                channel,
                subscribe_codes::TIMEOUT,
                "subscribe acknowledgement timed out",
            )
        }
        AckReply::Disconnected => {
            return SubscribeResponse::failure(
                channel,
                subscribe_codes::DISCONNECTED,
                "connection lost before the subscription was acknowledged",
            )
        }
    };

    let Some(object) = args.first().and_then(Value::as_object) else {
        debug!(channel = %channel, "Subscribe ack is not an object");
        return SubscribeResponse::failure(
            channel,
            subscribe_codes::INVALID_RESPONSE,
            "acknowledgement is not an object",
        );
    };

    if object.get("ok").and_then(Value::as_bool) == Some(true) {
        return SubscribeResponse::success(channel);
    }

    if let Some(error) = object.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or(subscribe_codes::UNKNOWN);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("subscription rejected");
        return SubscribeResponse::failure(channel, code, message);
    }

    SubscribeResponse::failure(
        channel,
        subscribe_codes::UNKNOWN,
        "unrecognised acknowledgement",
    )
}
