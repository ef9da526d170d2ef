//! Keyword tables backing the conversation analyzer. Plain substring
//! matching on lowercased text — small tables, no NLP model, easy to
//! extend per language.

use voxloop_core::{CustomerProfile, Objection};

pub const DECISION_KEYWORDS: &[&str] = &[
    "buy", "purchase", "sign up", "ready to", "let's do it", "proceed", "confirm",
    "book it", "go ahead", "finalize",
];

pub const CONSIDERATION_KEYWORDS: &[&str] = &[
    "compare", "thinking about", "not sure", "options", "how does it work",
    "what if", "considering", "pros and cons", "difference between",
];

pub fn profile_keywords(profile: CustomerProfile) -> &'static [&'static str] {
    match profile {
        CustomerProfile::Analytical => {
            &["data", "numbers", "statistics", "specifically", "percentage", "report", "compare"]
        }
        CustomerProfile::Emotional => {
            &["feel", "worried", "excited", "love", "scared", "happy", "frustrated"]
        }
        CustomerProfile::Skeptical => {
            &["really?", "doubt", "not convinced", "prove it", "sounds too good", "suspicious"]
        }
        CustomerProfile::DecisionMaker => {
            &["just tell me", "bottom line", "cut to the chase", "decide", "my call", "i'll decide"]
        }
        CustomerProfile::RelationshipSeeker => {
            &["how are you", "tell me about yourself", "appreciate", "trust you", "relationship"]
        }
    }
}

/// Tie-break order when multiple profiles score equally.
pub const PROFILE_PRIORITY: &[CustomerProfile] = &[
    CustomerProfile::Analytical,
    CustomerProfile::Emotional,
    CustomerProfile::Skeptical,
    CustomerProfile::DecisionMaker,
    CustomerProfile::RelationshipSeeker,
];

pub fn objection_keywords(objection: Objection) -> &'static [&'static str] {
    match objection {
        Objection::Price => &["expensive", "cost too much", "price", "afford", "cheaper"],
        Objection::Quality => &["quality", "reliable", "durable", "works well", "good enough"],
        Objection::Trust => &["scam", "trust", "legit", "verify", "who are you"],
        Objection::Timing => &["not now", "later", "busy", "next month", "bad time"],
        Objection::Need => &["don't need", "already have", "not interested", "no use for"],
    }
}

pub const ALL_OBJECTIONS: &[Objection] = &[
    Objection::Price,
    Objection::Quality,
    Objection::Trust,
    Objection::Timing,
    Objection::Need,
];

pub const POSITIVE_SENTIMENT_KEYWORDS: &[&str] =
    &["great", "love", "good", "yes", "happy", "excellent", "perfect", "thanks"];
pub const NEGATIVE_SENTIMENT_KEYWORDS: &[&str] =
    &["bad", "no", "hate", "angry", "terrible", "annoyed", "frustrated", "stop"];
pub const INTENSIFIER_KEYWORDS: &[&str] = &["very", "extremely", "really", "absolutely", "totally"];

/// Romanized ("Hinglish") keywords used once script-range detection finds no
/// non-Latin script in the text.
pub const HINGLISH_KEYWORDS: &[&str] = &[
    "hai", "nahi", "kya", "aap", "kaise", "mera", "accha", "theek", "haan", "namaste",
    "kyun", "bahut", "matlab", "chalega",
];
