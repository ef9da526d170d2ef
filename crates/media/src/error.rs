use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("malformed carrier envelope: {0}")]
    MalformedEnvelope(String),

    #[error("unsupported carrier event: {0}")]
    UnsupportedEvent(String),

    #[error("unsupported media encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("media frame received before a `start` event")]
    NotStarted,

    #[error("carrier too slow")]
    CarrierTooSlow,
}

pub type Result<T> = std::result::Result<T, MediaError>;
