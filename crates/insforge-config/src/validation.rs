//! Configuration validation.
//!
//! Each section has its own validator; problems are collected into a
//! single `ConfigError`.

mod helpers;
mod realtime;


use crate::schema::InsforgeConfig;
use insforge_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &InsforgeConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    realtime::validate_base_url(&mut errors, config);
    realtime::validate_realtime(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
