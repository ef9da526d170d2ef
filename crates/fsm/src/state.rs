//! `CallState`: the nine in-conversation states (spec §4.8 table), distinct
//! from `voxloop_core::CallStatus` (the carrier/persistence-facing status).
//! `CallStatus` tracks what the carrier leg is doing; `CallState` tracks
//! where the conversation loop is inside one answered call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    Init,
    Welcome,
    Listening,
    HumanSpeaking,
    Thinking,
    Responding,
    ResponseComplete,
    CallEnding,
    Ended,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Init => "INIT",
            CallState::Welcome => "WELCOME",
            CallState::Listening => "LISTENING",
            CallState::HumanSpeaking => "HUMAN_SPEAKING",
            CallState::Thinking => "THINKING",
            CallState::Responding => "RESPONDING",
            CallState::ResponseComplete => "RESPONSE_COMPLETE",
            CallState::CallEnding => "CALL_ENDING",
            CallState::Ended => "ENDED",
        }
    }
}
