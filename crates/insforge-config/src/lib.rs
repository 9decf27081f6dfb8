//! InsForge client configuration.
//!
//! TOML-based configuration for the realtime client and the `insforge-rt`
//! tool. Every section uses serde defaults so a partial file (or no file
//! at all) still yields a usable config.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use insforge_config::load_config;
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config.base_url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod toml_writer;
pub mod validation;

use std::path::Path;

pub use schema::{InsforgeConfig, LogLevel, LoggingConfig, RealtimeSettings};
pub use toml_loader::{default_config_path, load_default, load_from_path};
pub use toml_writer::{save_config, save_config_to_path};

use insforge_common::ConfigError;

/// Load config from `path` (or the platform default) and validate it.
///
/// Unlike [`load_from_path`], which only warns on invalid values, this
/// rejects a config that fails validation.
pub fn load_config(path: Option<&Path>) -> Result<InsforgeConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &InsforgeConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
