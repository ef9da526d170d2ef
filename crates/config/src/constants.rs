//! Centralized defaults for values pinned to a specific number.
//!
//! These are the fallbacks `Settings::default()` and `default.yaml` agree on;
//! anything a deployment wants to change belongs in `config/*.yaml` or an
//! environment override, not here.

/// VAD and silence-segmentation defaults (spec §4.2).
pub mod vad {
    pub const ENERGY_THRESHOLD_DB: f32 = -40.0;
    pub const SILENCE_HANGOVER_MS: u64 = 800;
    pub const MIN_SPEECH_MS: u64 = 120;
    pub const FRAME_MS: u64 = 20;
}

/// Deadlines for blocking operations (spec §5).
pub mod timeouts {
    pub const PROVIDER_HTTP_SECS: u64 = 8;
    pub const LLM_CONNECT_SECS: u64 = 5;
    pub const DB_WRITE_SECS: u64 = 2;
    pub const MANUAL_HANGUP_CLEANUP_SECS: u64 = 10;
    /// Dead-session timeout: no LLM audio at all for this long (spec §4.7).
    pub const LLM_DEAD_SESSION_SECS: u64 = 15;
}

/// `CallStateMachine` per-state timers (spec §4.8 table).
pub mod fsm {
    pub const INIT_SETUP_SECS: u64 = 10;
    pub const WELCOME_MAX_SECS: u64 = 5;
    pub const HUMAN_SPEAKING_MAX_SECS: u64 = 30;
    pub const THINKING_TIMEOUT_SECS: u64 = 15;
    pub const RESPONDING_MAX_SECS: u64 = 60;
    pub const RESPONSE_COMPLETE_GRACE_MS: u64 = 500;
    pub const FILLER_GRACE_MS: u64 = 200;
    pub const LLM_RECONNECT_DEADLINE_SECS: u64 = 2;
}

/// `MediaBridge` backpressure thresholds (spec §4.9).
pub mod media {
    pub const OUTBOUND_QUEUE_MAX_MS: u64 = 500;
    pub const INBOUND_QUEUE_MAX_MS: u64 = 1000;
    pub const OUTBOUND_FRAME_MS: u64 = 20;
}

/// `ProviderDriver` retry policy for `InitiateCall` only (spec §7).
pub mod retry {
    pub const INITIATE_CALL_MAX_RETRIES: u32 = 2;
    pub const BACKOFF_INITIAL_MS: u64 = 200;
    pub const BACKOFF_SECOND_MS: u64 = 1000;
    pub const CALL_STORE_MAX_RETRIES: u32 = 3;
}

/// `HedgeEngine` preload size.
pub mod hedge {
    pub const DEFAULT_PREWARM_N: usize = 16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_numbers() {
        assert_eq!(vad::ENERGY_THRESHOLD_DB, -40.0);
        assert_eq!(vad::SILENCE_HANGOVER_MS, 800);
        assert_eq!(fsm::THINKING_TIMEOUT_SECS, 15);
        assert_eq!(media::OUTBOUND_QUEUE_MAX_MS, 500);
    }
}
