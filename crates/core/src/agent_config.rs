//! `AgentConfig`: immutable per-call configuration describing how an agent
//! should sound and behave.

use crate::classification::Language;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackgroundNoise {
    Office,
    Quiet,
    Cafe,
    Street,
    CallCenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoicemailAction {
    HangUp,
    LeaveMessage,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartBehavior {
    WaitForHuman,
    StartImmediately,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub language_code: String,
}

impl VoiceProfile {
    /// Resolve `language_code` through the supported language table.
    pub fn language(&self) -> Result<Language> {
        Language::parse(&self.language_code)
            .ok_or_else(|| CoreError::UnknownLanguage(self.language_code.clone()))
    }
}

/// Voice-delivery sliders. All numeric fields are clamped to their documented
/// range at construction time rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub voice_speed: f32,
    pub interruption_sensitivity: f32,
    pub responsiveness: f32,
    pub emotion: f32,
    pub background_noise: BackgroundNoise,
}

impl SpeechConfig {
    pub fn new(
        voice_speed: f32,
        interruption_sensitivity: f32,
        responsiveness: f32,
        emotion: f32,
        background_noise: BackgroundNoise,
    ) -> Self {
        Self {
            voice_speed: voice_speed.clamp(0.75, 1.25),
            interruption_sensitivity: interruption_sensitivity.clamp(0.0, 1.0),
            responsiveness: responsiveness.clamp(0.0, 1.0),
            emotion: emotion.clamp(0.0, 1.0),
            background_noise,
        }
    }

    /// Debounce window for barge-in detection: `max(80, 300 - sensitivity*250)` ms.
    pub fn interruption_debounce_ms(&self) -> u64 {
        (300.0 - self.interruption_sensitivity * 250.0).max(80.0) as u64
    }

    /// Whether a filler should be played while THINKING (spec: responsiveness < 0.8).
    pub fn wants_filler(&self) -> bool {
        self.responsiveness < 0.8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLimits {
    pub max_call_duration_sec: u32,
    pub silence_detection_ms: u32,
    pub voicemail_detection: bool,
    pub voicemail_action: VoicemailAction,
    pub voicemail_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub welcome_message: String,
    pub characteristics: Vec<String>,
    pub voice_profile: VoiceProfile,
    pub speech: SpeechConfig,
    pub limits: CallLimits,
    pub start_behavior: StartBehavior,
    pub knowledge_base: Vec<String>,
}

impl AgentConfig {
    /// Validate cross-field invariants not already enforced by construction
    /// (the language table lookup needs an explicit call since `Language` is
    /// not stored on `AgentConfig` itself).
    pub fn validate(&self) -> Result<Language> {
        self.voice_profile.language()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_config_clamps_sliders() {
        let cfg = SpeechConfig::new(5.0, -1.0, 2.0, -5.0, BackgroundNoise::Office);
        assert_eq!(cfg.voice_speed, 1.25);
        assert_eq!(cfg.interruption_sensitivity, 0.0);
        assert_eq!(cfg.responsiveness, 1.0);
        assert_eq!(cfg.emotion, 0.0);
    }

    #[test]
    fn debounce_matches_spec_bounds() {
        let max_sensitivity = SpeechConfig::new(1.0, 1.0, 0.5, 0.5, BackgroundNoise::Quiet);
        assert_eq!(max_sensitivity.interruption_debounce_ms(), 80);

        let zero_sensitivity = SpeechConfig::new(1.0, 0.0, 0.5, 0.5, BackgroundNoise::Quiet);
        assert_eq!(zero_sensitivity.interruption_debounce_ms(), 300);
    }

    #[test]
    fn unknown_language_code_is_rejected() {
        let profile = VoiceProfile {
            voice_id: "v1".into(),
            language_code: "zz".into(),
        };
        assert!(profile.language().is_err());
    }
}
