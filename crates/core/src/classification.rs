//! Shared vocabulary enums produced by the conversation analyzer and consumed
//! by the principle engine, hedge engine, and state machine.

use serde::{Deserialize, Serialize};

/// Buying-journey stage, sticky only per conversation analyzer rules (see
/// the intelligence crate); the variant itself carries no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Awareness,
    Consideration,
    Decision,
}

/// Customer communication profile, cached once confidently assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerProfile {
    Analytical,
    Emotional,
    Skeptical,
    DecisionMaker,
    RelationshipSeeker,
}

/// Objection categories; a turn may raise more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objection {
    Price,
    Quality,
    Trust,
    Timing,
    Need,
}

/// Supported conversation languages. `Language` is sticky on `Call` once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    En,
    Hi,
    Mr,
    Ta,
    Te,
    Kn,
    Hinglish,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Mr => "mr",
            Language::Ta => "ta",
            Language::Te => "te",
            Language::Kn => "kn",
            Language::Hinglish => "hinglish",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "hi" => Some(Language::Hi),
            "mr" => Some(Language::Mr),
            "ta" => Some(Language::Ta),
            "te" => Some(Language::Te),
            "kn" => Some(Language::Kn),
            "hinglish" => Some(Language::Hinglish),
            _ => None,
        }
    }
}

/// One of the six Cialdini influence principles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principle {
    Reciprocity,
    Commitment,
    SocialProof,
    Authority,
    Liking,
    Scarcity,
}

impl Principle {
    /// Stable textual directive the state machine folds into the system
    /// instruction before each LLM turn.
    pub fn system_instruction_fragment(&self) -> &'static str {
        match self {
            Principle::Reciprocity => {
                "Offer something of value first (information, a concession, a favor) before asking for commitment."
            }
            Principle::Commitment => {
                "Anchor to a small commitment the customer already made and build on it consistently."
            }
            Principle::SocialProof => {
                "Reference what similar customers have done or decided to normalize the desired action."
            }
            Principle::Authority => {
                "Cite credentials, expertise, or institutional backing to establish trust in the recommendation."
            }
            Principle::Liking => {
                "Build rapport: mirror the customer's language, find common ground, be warm."
            }
            Principle::Scarcity => {
                "Emphasize limited availability or a closing window to encourage timely decision-making."
            }
        }
    }
}
