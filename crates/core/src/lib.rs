//! Domain entities for the voice-agent call pipeline: `AgentConfig`,
//! `ProviderConfig`, `PhoneNumber`, `Call`, `Turn`, and `FillerClip`, plus
//! the shared classification vocabulary (stage/profile/objection/language/
//! principle) produced by the intelligence layer and consumed everywhere
//! else.

pub mod agent_config;
pub mod audit;
pub mod call;
pub mod classification;
pub mod error;
pub mod filler;
pub mod phone_number;
pub mod provider_config;
pub mod turn;

pub use agent_config::{
    AgentConfig, BackgroundNoise, CallLimits, SpeechConfig, StartBehavior, VoiceProfile,
    VoicemailAction,
};
pub use audit::{AuditEntry, AuditLog};
pub use call::{Call, CallDirection, CallMetrics, CallOutcome, CallStatus};
pub use classification::{CustomerProfile, Language, Objection, Principle, Stage};
pub use error::{CoreError, Result};
pub use filler::{FillerClip, FillerEffectiveness, FillerMetadata};
pub use phone_number::PhoneNumber;
pub use provider_config::{ProviderConfig, ProviderKind};
pub use turn::Turn;
