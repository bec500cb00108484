use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("queue connection error: {0}")]
    ConnectionError(String),

    #[error("failed to publish job: {0}")]
    PublishError(String),

    #[error("failed to subscribe to topic: {0}")]
    SubscribeError(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("pulsar error: {0}")]
    PulsarError(#[from] pulsar::Error),
}

pub type Result<T> = std::result::Result<T, EventError>;
