//! Energy-threshold voice-activity detector with a silence-hangover timer.
//!
//! Stateful per call: one `VoiceActivityDetector` instance is owned by each
//! call's state machine and fed frames in arrival order.

pub mod config;
pub mod detector;

pub use config::VadConfig;
pub use detector::{VadEvent, VoiceActivityDetector};
