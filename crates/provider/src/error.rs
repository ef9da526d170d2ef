use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("provider authentication failed")]
    AuthFailed,
    #[error("invalid destination number: {0}")]
    InvalidTo(String),
    #[error("invalid caller-id number: {0}")]
    InvalidFrom(String),
    #[error("number not verified with carrier: {0}")]
    NumberNotVerified(String),
    #[error("account billing is blocking this call")]
    BillingBlocked,
    #[error("rate limited by carrier")]
    RateLimited,
    #[error("network error talking to carrier: {0}")]
    NetworkError(String),
    #[error("carrier request timed out")]
    Timeout,
    #[error("unclassified provider error: {0}")]
    UnknownProviderError(String),
}

impl ProviderError {
    /// Transient errors (spec §7: "Transient provider/network errors
    /// (timeout, 5xx, connection reset): up to 2 retries with exponential
    /// backoff ... for `InitiateCall` only"). Everything else — including
    /// `RateLimited`, which the spec does not list among the transient
    /// categories — fails on the first attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Timeout | ProviderError::NetworkError(_))
            || matches!(self, ProviderError::UnknownProviderError(msg) if is_5xx_message(msg))
    }
}

fn is_5xx_message(msg: &str) -> bool {
    msg.split_whitespace().any(|tok| tok.len() == 3 && tok.starts_with('5') && tok.chars().all(|c| c.is_ascii_digit()))
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::NetworkError(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
