//! `LlmEvent`: the event stream a `LLMSession` emits (spec §4.7).

use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum LlmEvent {
    /// 24 kHz PCM16 little-endian audio for the current model turn.
    AudioChunk(Arc<[u8]>),
    /// The model has begun a response to the current user turn.
    ResponseStart,
    /// A partial transcript of the model's own speech, if the backend
    /// provides one. Not the user's transcript (that comes from
    /// `TranscriptPartial`, produced from the carrier-side VAD boundary).
    ResponseTextPartial(String),
    /// The model has finished a response turn.
    ResponseComplete,
    /// Partial transcript of what the model heard the human say. The state
    /// machine accumulates these into the completed user turn's transcript.
    TranscriptPartial(String),
    /// A transport- or protocol-level error. Non-fatal on its own; the
    /// caller decides whether to reconnect.
    Error(String),
}
