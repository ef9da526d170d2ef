//! `Turn`: one exchange inside `Call.transcript`.

use crate::classification::{CustomerProfile, Language, Objection, Principle, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based, monotonically increasing within a call.
    pub turn_number: u32,
    pub user_text: String,
    pub agent_text: Option<String>,
    pub stage: Stage,
    pub profile: CustomerProfile,
    pub objections: Vec<Objection>,
    pub applied_principle: Principle,
    pub language: Language,
    pub sentiment: f32,
    pub filler_clip_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}
