use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use insforge_common::{InsforgeError, Result};
use insforge_config::InsforgeConfig;
use insforge_realtime::{events, Channel, RealtimeClient, SocketMessage, SubscribeResponse};

const FLUSH_GRACE: Duration = Duration::from_millis(250);

fn subscribe_error(response: SubscribeResponse) -> InsforgeError {
    match response {
        SubscribeResponse::Failure {
            channel,
            code,
            message,
        } => InsforgeError::Realtime(format!("subscribe to {channel} failed: {code}: {message}")),
        SubscribeResponse::Success { channel } => {
            InsforgeError::Other(format!("unexpected success for {channel}"))
        }
    }
}

/// One output line per received message. The event name is not part of
/// the message, so only the channel it arrived on is added.
fn render(channel: &str, message: &SocketMessage) -> Value {
    json!({
        "channel": channel,
        "meta": message.meta,
        "payload": message.payload,
    })
}

pub async fn listen(client: &RealtimeClient, channels: &[String], event: Option<&str>) -> Result<()> {
    client.on_disconnect(|reason| tracing::warn!(reason = %reason, "Disconnected; waiting for reconnect"));
    client.on_connect(|| tracing::info!("Connected"));
    client.on_error(|e| {
        tracing::warn!(channel = ?e.channel, code = %e.code, message = %e.message, "Server error")
    });

    client.connect().await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let mut handles: Vec<Channel> = Vec::with_capacity(channels.len());
    for name in channels {
        let channel = client.channel(name);
        let tx = tx.clone();
        let label = name.clone();
        channel.on(event.unwrap_or(events::WILDCARD), move |message| {
            let _ = tx.send(render(&label, message));
        });

        let response = channel.subscribe().await;
        if !response.is_ok() {
            return Err(subscribe_error(response));
        }
        tracing::info!(channel = %name, "Listening");
        handles.push(channel);
    }
    drop(tx);

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            line = rx.recv() => match line {
                Some(line) => println!("{line}"),
                None => break,
            },
            _ = &mut interrupt => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    for channel in &handles {
        channel.unsubscribe();
    }
    client.disconnect();
    Ok(())
}

pub async fn publish(client: &RealtimeClient, channel: &str, event: &str, payload: &str) -> Result<()> {
    let payload: Value = serde_json::from_str(payload)?;
    if !payload.is_object() {
        return Err(InsforgeError::Other("payload must be a JSON object".into()));
    }

    client.connect().await?;
    let response = client.subscribe(channel).await;
    if !response.is_ok() {
        return Err(subscribe_error(response));
    }

    client.publish(channel, event, payload)?;
    tracing::info!(channel = %channel, event = %event, "Published");

    // The frame is written by the connection task; give it a moment
    // before the runtime shuts down.
    tokio::time::sleep(FLUSH_GRACE).await;
    client.disconnect();
    Ok(())
}

pub fn show_config(config: &InsforgeConfig) {
    println!("{}", insforge_config::config_to_json(config));
}

/// Validate and write `config` to `path`, or the default location.
pub fn save_config(config: &InsforgeConfig, path: Option<&Path>) -> Result<()> {
    insforge_config::validation::validate(config)?;
    match path {
        Some(path) => insforge_config::save_config_to_path(config, path)?,
        None => insforge_config::save_config(config)?,
    }
    tracing::info!(base_url = %config.base_url, "Saved config");
    Ok(())
}
