//! Config overrides and client construction.

use std::sync::Arc;
use std::time::Duration;

use insforge_config::{InsforgeConfig, LogLevel};
use insforge_realtime::{RealtimeClient, RealtimeConfig, StaticToken, TokenProvider, WithFallback};

/// The loaded config with command-line overrides applied.
pub fn effective_config(mut config: InsforgeConfig, url: Option<&str>) -> InsforgeConfig {
    if let Some(url) = url {
        config.base_url = url.to_string();
    }
    config
}

pub fn default_filter(level: LogLevel) -> String {
    let level = level.as_filter();
    format!("insforge_rt={level},insforge_realtime={level}")
}

pub fn realtime_config(config: &InsforgeConfig) -> RealtimeConfig {
    let settings = &config.realtime;
    RealtimeConfig {
        base_url: config.base_url.clone(),
        path: settings.path.clone(),
        ack_timeout: Duration::from_millis(settings.ack_timeout_ms),
        connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        reconnect: settings.reconnect,
        reconnect_delay_secs: settings.reconnect_delay_secs,
        max_reconnect_delay_secs: settings.max_reconnect_delay_secs,
    }
}

/// Explicit token first, then the configured anon key.
pub fn token_provider(token: Option<String>, anon_key: Option<&str>) -> Arc<dyn TokenProvider> {
    let explicit = match token {
        Some(token) => StaticToken::new(token),
        None => StaticToken::anonymous(),
    };
    match anon_key {
        Some(key) => Arc::new(WithFallback::new(explicit, key)),
        None => Arc::new(explicit),
    }
}

pub fn build_client(config: &InsforgeConfig, token: Option<String>) -> RealtimeClient {
    RealtimeClient::new(
        realtime_config(config),
        token_provider(token, config.anon_key.as_deref()),
    )
}
