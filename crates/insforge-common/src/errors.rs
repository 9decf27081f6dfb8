use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InsforgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("realtime error: {0}")]
    Realtime(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("realtime.ack_timeout_ms = 0".into());
        assert_eq!(
            err.to_string(),
            "config validation error: realtime.ack_timeout_ms = 0"
        );
    }

    #[test]
    fn insforge_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: InsforgeError = config_err.into();
        assert!(matches!(err, InsforgeError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn insforge_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: InsforgeError = io_err.into();
        assert!(matches!(err, InsforgeError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn insforge_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: InsforgeError = json_err.into();
        assert!(matches!(err, InsforgeError::Json(_)));
    }

    #[test]
    fn insforge_error_other_variants() {
        let err = InsforgeError::Network("timeout".into());
        assert_eq!(err.to_string(), "network error: timeout");

        let err = InsforgeError::Auth("session expired".into());
        assert_eq!(err.to_string(), "auth error: session expired");

        let err = InsforgeError::Realtime("not connected".into());
        assert_eq!(err.to_string(), "realtime error: not connected");

        let err = InsforgeError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
