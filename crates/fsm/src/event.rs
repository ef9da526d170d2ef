//! `CallEvent`: the inputs the state machine reacts to, sourced from the
//! merged event channel `{VADEvent, LLMEvent, Timer, ControlEvent}` the
//! concurrency model describes.

use voxloop_provider::AnsweredBy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    InitSetup,
    Welcome,
    HumanSpeakingMax,
    Thinking,
    RespondingMax,
    ResponseCompleteGrace,
    FillerGrace,
}

#[derive(Debug, Clone)]
pub enum CallEvent {
    SetupOk,
    SetupFailed,
    WelcomeAudioFinished,
    SpeechStart,
    AudioChunk,
    /// `transcript` is the accumulated user utterance for this turn, as
    /// produced by `LLMSession`'s `TranscriptPartial` events.
    SpeechEnd { transcript: String },
    MaxDurationExceeded,
    ManualHangup,
    LlmResponseStart,
    LlmError,
    InterruptionDetected,
    ResponseComplete,
    AnsweredByDetected(AnsweredBy),
    Timeout(TimerKind),
}
