use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("failed to connect to LLM session endpoint: {0}")]
    ConnectFailed(String),

    #[error("LLM session connect timed out")]
    ConnectTimeout,

    #[error("LLM session closed by the model")]
    Closed,

    #[error("no audio received for {0}s (dead-session timeout)")]
    DeadSession(u64),

    #[error("malformed event from LLM session: {0}")]
    MalformedEvent(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("session already closed")]
    AlreadyClosed,
}

pub type Result<T> = std::result::Result<T, LlmError>;
