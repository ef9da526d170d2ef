//! Bidirectional streaming session to the multimodal LLM (spec §4.7):
//! accepts 16 kHz PCM input, emits 24 kHz PCM output, accepts a replaceable
//! system instruction between turns, and supports mid-turn cancellation for
//! barge-in.

pub mod error;
pub mod event;
pub mod fake;
pub mod realtime;
pub mod reconnect;
pub mod session;

pub use error::{LlmError, Result};
pub use event::LlmEvent;
pub use fake::{FakeCallLog, FakeLlmSession};
pub use realtime::RealtimeSession;
pub use reconnect::reconnect_once;
pub use session::{LlmSession, VoiceConfig};
