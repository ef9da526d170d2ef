use thiserror::Error;

use crate::state::CallState;

#[derive(Debug, Clone, Error)]
pub enum FsmError {
    #[error("event not valid in state {state:?}: {event}")]
    InvalidTransition { state: CallState, event: String },

    #[error("no checkpoint at index {0}")]
    NoCheckpoint(usize),
}

pub type Result<T> = std::result::Result<T, FsmError>;
