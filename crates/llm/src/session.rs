//! `LLMSession`: the bidirectional streaming contract (spec §4.7). A trait
//! rather than a single concrete struct so the state machine and media
//! bridge never depend on the realtime transport directly — tests drive a
//! fake implementation, production wires `RealtimeSession`.

use async_trait::async_trait;

use crate::error::Result;
use crate::event::LlmEvent;

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub voice_id: String,
    pub language_code: String,
}

#[async_trait]
pub trait LlmSession: Send + Sync {
    /// Push one frame of 16 kHz PCM16 little-endian audio. May be called
    /// many times per second; must not block on model output.
    async fn send_audio(&self, pcm16_16k: &[u8]) -> Result<()>;

    /// Send a standalone text turn (used for the welcome message and
    /// voicemail announcements).
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Replace the system instruction. Safe to call between user turns;
    /// must not corrupt an in-progress response, so implementations queue
    /// the update until the current turn completes.
    async fn update_system_instruction(&self, instruction: &str) -> Result<()>;

    /// Barge-in: ask the model to stop emitting audio for the current turn
    /// promptly. Already-queued `AudioChunk` events for that turn are
    /// dropped by the session, not just the caller.
    async fn cancel(&self) -> Result<()>;

    /// Pull the next session event, or `None` once the session is closed
    /// and drained.
    async fn next_event(&self) -> Option<LlmEvent>;

    async fn close(&self);
}
