//! `CallAction`: side effects the outer per-call worker must carry out after
//! a transition. The state machine itself never touches the network, the
//! LLM session, or the carrier socket — it only decides what should happen.

use std::time::Duration;
use voxloop_core::{CallStatus, FillerClip};

use crate::event::TimerKind;

#[derive(Debug, Clone)]
pub enum CallAction {
    PlayWelcome { text: String },
    PersistStatus(CallStatus),
    StartVad,
    StartBuffering,
    ForwardAudioToLlm,
    UpdateSystemInstruction(String),
    StartFiller(FillerClip),
    StopFiller,
    CancelLlmResponse,
    SendText(String),
    CloseLlmSession,
    FinalizeCall,
    EmitWebhook,
    ArmTimer(TimerKind, Duration),
    CancelTimer(TimerKind),
    LogError(String),
}
