//! `CallStateMachine`: drives one call through `INIT -> ... -> ENDED`
//! (spec §4.8). Pure and synchronous — every externally visible effect
//! comes back as a `CallAction` for the per-call worker to execute.

pub mod action;
pub mod checkpoint;
pub mod error;
pub mod event;
pub mod machine;
pub mod state;

pub use action::CallAction;
pub use checkpoint::{CallStateCheckpoint, FsmMetrics};
pub use error::{FsmError, Result};
pub use event::{CallEvent, TimerKind};
pub use machine::{CallStateMachine, TurnMetadata};
pub use state::CallState;
