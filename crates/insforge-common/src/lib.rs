pub mod errors;
pub mod id;

pub use errors::{ConfigError, InsforgeError};
pub use id::{new_id, ListenerId};

pub type Result<T> = std::result::Result<T, InsforgeError>;
