use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedworkError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for RedworkError {
    fn from(err: toml::de::Error) -> Self {
        RedworkError::Config(format!("TOML deserialization error: {}", err))
    }
}

impl From<toml::ser::Error> for RedworkError {
    fn from(err: toml::ser::Error) -> Self {
        RedworkError::Config(format!("TOML serialization error: {}", err))
    }
}
