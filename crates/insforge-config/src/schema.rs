//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod realtime;

pub use logging::*;
pub use realtime::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsforgeConfig {
    /// Backend base URL, e.g. `https://your-app.insforge.app`.
    pub base_url: String,
    /// Anonymous key, used as the socket token when no user session exists.
    pub anon_key: Option<String>,
    pub realtime: RealtimeSettings,
    pub logging: LoggingConfig,
}

impl Default for InsforgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7130".into(),
            anon_key: None,
            realtime: RealtimeSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl std::fmt::Debug for InsforgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsforgeConfig")
            .field("base_url", &self.base_url)
            .field("anon_key", &self.anon_key.as_ref().map(|_| "[REDACTED]"))
            .field("realtime", &self.realtime)
            .field("logging", &self.logging)
            .finish()
    }
}
