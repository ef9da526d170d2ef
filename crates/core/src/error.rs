use thiserror::Error;

/// Domain-level invariant violations. Transport/storage/provider crates have
/// their own error enums; this one is for the entities themselves.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("value {value} for field {field} is out of range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown language code: {0}")]
    UnknownLanguage(String),

    #[error("invalid E.164 phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("turn number {got} is not the expected {expected}")]
    TurnOutOfOrder { expected: u32, got: u32 },

    #[error("status transition from {from:?} to {to:?} is not allowed")]
    InvalidStatusTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
