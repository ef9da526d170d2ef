//! `FillerClip`: a pre-recorded filler audio asset, indexed by the hedge
//! engine. Stored as 24 kHz PCM on disk; resampled on play, never cached
//! per output rate (see design notes).

use crate::classification::{CustomerProfile, Language, Principle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillerEffectiveness {
    pub completion_rate: f32,
    pub sentiment_lift: f32,
    pub principle_reinforcement: f32,
}

impl FillerEffectiveness {
    /// Sort key used by `HedgeEngine::select_filler`.
    pub fn score(&self) -> f32 {
        self.completion_rate * self.principle_reinforcement
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerMetadata {
    pub languages: Vec<Language>,
    pub principles: Vec<Principle>,
    pub profiles: Vec<CustomerProfile>,
    pub tone: String,
    pub effectiveness: FillerEffectiveness,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerClip {
    pub id: String,
    pub audio_path: PathBuf,
    pub duration_sec: f32,
    pub metadata: FillerMetadata,
}

impl FillerClip {
    /// A synthetic 2.0s silent clip, returned by the hedge engine when the
    /// catalog is empty.
    pub fn synthetic_silence(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            audio_path: PathBuf::new(),
            duration_sec: 2.0,
            metadata: FillerMetadata {
                languages: vec![],
                principles: vec![],
                profiles: vec![],
                tone: "silence".to_string(),
                effectiveness: FillerEffectiveness::default(),
            },
        }
    }

    pub fn is_synthetic_silence(&self) -> bool {
        self.audio_path.as_os_str().is_empty()
    }
}
