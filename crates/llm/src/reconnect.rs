//! One-shot reconnect helper for the §4.8/§7 policy: on a mid-call LLM
//! session drop, attempt exactly one reconnect with the same system
//! instruction; if it doesn't succeed within `deadline`, the caller
//! transitions the call to `CALL_ENDING` with `outcome=llm_unavailable`.

use std::time::Duration;

use crate::error::Result;
use crate::realtime::RealtimeSession;
use crate::session::VoiceConfig;

#[allow(clippy::too_many_arguments)]
pub async fn reconnect_once(
    endpoint: &str,
    api_key: &str,
    model: &str,
    system_instruction: String,
    voice: VoiceConfig,
    connect_timeout: Duration,
    dead_session_timeout: Duration,
    deadline: Duration,
) -> Result<RealtimeSession> {
    tokio::time::timeout(
        deadline,
        RealtimeSession::open(
            endpoint,
            api_key,
            model,
            system_instruction,
            voice,
            connect_timeout,
            dead_session_timeout,
        ),
    )
    .await
    .map_err(|_| crate::error::LlmError::ConnectTimeout)?
}
