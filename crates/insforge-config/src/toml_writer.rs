//! Write InsforgeConfig to TOML on disk.
//!
//! Writes go to a `.tmp` sibling first and are renamed into place.

use std::path::Path;

use insforge_common::ConfigError;

use tracing::{debug, warn};

use crate::schema::InsforgeConfig;
use crate::toml_loader::{default_config_path, ensure_parent_dir};

/// Write config to the platform default path.
pub fn save_config(config: &InsforgeConfig) -> Result<(), ConfigError> {
    let path = default_config_path()?;
    save_config_to_path(config, &path)
}

/// Write config to `path`, creating parent directories as needed.
pub fn save_config_to_path(config: &InsforgeConfig, path: &Path) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| ConfigError::ParseError(format!("cannot serialize config: {e}")))?;
    ensure_parent_dir(path)?;

    let write = |target: &Path| {
        std::fs::write(target, &rendered).map_err(|e| {
            ConfigError::ParseError(format!("cannot write {}: {e}", target.display()))
        })
    };

    let staged = path.with_extension("toml.tmp");
    write(&staged)?;
    if let Err(e) = std::fs::rename(&staged, path) {
        warn!(error = %e, "Rename into place failed; writing directly");
        let _ = std::fs::remove_file(&staged);
        write(path)?;
    }

    debug!(path = %path.display(), "Saved config");
    Ok(())
}
