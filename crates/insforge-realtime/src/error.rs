#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("not connected to the realtime server")]
    NotConnected,

    #[error("realtime connection failed: {0}")]
    ConnectionFailed(String),

    #[error("could not resolve access token: {0}")]
    Auth(String),

    #[error("realtime transport error: {0}")]
    Transport(String),
}

impl From<RealtimeError> for insforge_common::InsforgeError {
    fn from(err: RealtimeError) -> Self {
        match err {
            RealtimeError::Auth(msg) => Self::Auth(msg),
            RealtimeError::Transport(msg) => Self::Network(msg),
            other => Self::Realtime(other.to_string()),
        }
    }
}
