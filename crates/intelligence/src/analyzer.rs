//! `ConversationAnalyzer`: per-turn classifier. The scoring rules themselves
//! are pure functions of the text; stickiness (profile, language) lives in
//! `AnalyzerState`, one instance per call, so the process has no global
//! mutable classification cache.

use crate::keywords::{
    objection_keywords, profile_keywords, ALL_OBJECTIONS, CONSIDERATION_KEYWORDS,
    DECISION_KEYWORDS, HINGLISH_KEYWORDS, INTENSIFIER_KEYWORDS, NEGATIVE_SENTIMENT_KEYWORDS,
    POSITIVE_SENTIMENT_KEYWORDS, PROFILE_PRIORITY,
};
use voxloop_core::{CustomerProfile, Language, Objection, Stage};

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub stage: Stage,
    pub profile: CustomerProfile,
    pub objections: Vec<Objection>,
    pub language: Language,
    pub sentiment: f32,
}

/// Per-call sticky state. Owned by the state machine alongside the `Call`.
#[derive(Debug, Default)]
pub struct AnalyzerState {
    cached_profile: Option<CustomerProfile>,
    cached_language: Option<Language>,
}

pub struct ConversationAnalyzer;

impl ConversationAnalyzer {
    /// `turn_number` is 1-based, matching `Turn::turn_number`.
    pub fn analyze(
        state: &mut AnalyzerState,
        turn_number: u32,
        current_text: &str,
        prior_text: Option<&str>,
    ) -> AnalysisResult {
        let current_lower = current_text.to_lowercase();
        let prior_lower = prior_text.map(|t| t.to_lowercase());

        AnalysisResult {
            stage: classify_stage(turn_number, &current_lower),
            profile: classify_profile(state, &current_lower, prior_lower.as_deref()),
            objections: classify_objections(&current_lower),
            language: classify_language(state, current_text),
            sentiment: classify_sentiment(&current_lower),
        }
    }
}

fn classify_stage(turn_number: u32, text_lower: &str) -> Stage {
    if turn_number < 3 {
        return Stage::Awareness;
    }

    let has_decision = DECISION_KEYWORDS.iter().any(|k| text_lower.contains(k));
    let has_consideration = CONSIDERATION_KEYWORDS.iter().any(|k| text_lower.contains(k));

    if has_decision {
        Stage::Decision
    } else if has_consideration {
        Stage::Consideration
    } else if turn_number >= 8 {
        Stage::Decision
    } else {
        Stage::Awareness
    }
}

fn classify_profile(
    state: &mut AnalyzerState,
    current_lower: &str,
    prior_lower: Option<&str>,
) -> CustomerProfile {
    if let Some(cached) = state.cached_profile {
        return cached;
    }

    let mut best = PROFILE_PRIORITY[0];
    let mut best_score = -1i32;

    for &profile in PROFILE_PRIORITY {
        let keywords = profile_keywords(profile);
        let current_hits = keywords.iter().filter(|k| current_lower.contains(**k)).count() as i32;
        let prior_hits = prior_lower
            .map(|t| keywords.iter().filter(|k| t.contains(**k)).count() as i32)
            .unwrap_or(0);
        let score = current_hits * 3 + prior_hits;

        if score > best_score {
            best_score = score;
            best = profile;
        }
    }

    if best_score >= 3 {
        state.cached_profile = Some(best);
    }

    best
}

fn classify_objections(text_lower: &str) -> Vec<Objection> {
    ALL_OBJECTIONS
        .iter()
        .copied()
        .filter(|&objection| objection_keywords(objection).iter().any(|k| text_lower.contains(k)))
        .collect()
}

fn classify_language(state: &mut AnalyzerState, current_text: &str) -> Language {
    if let Some(cached) = state.cached_language {
        return cached;
    }

    let detected = detect_language_uncached(current_text);
    if let Some(lang) = detected {
        state.cached_language = Some(lang);
        lang
    } else {
        // Nothing detected yet; default to English without caching so a
        // later turn with real signal can still set the sticky value.
        Language::En
    }
}

fn detect_language_uncached(text: &str) -> Option<Language> {
    for ch in text.chars() {
        let cp = ch as u32;
        if (0x0900..=0x097F).contains(&cp) {
            return Some(Language::Hi);
        }
        if (0x0B80..=0x0BFF).contains(&cp) {
            return Some(Language::Ta);
        }
        if (0x0C00..=0x0C7F).contains(&cp) {
            return Some(Language::Te);
        }
        if (0x0C80..=0x0CFF).contains(&cp) {
            return Some(Language::Kn);
        }
    }

    let lower = text.to_lowercase();
    if HINGLISH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some(Language::Hinglish);
    }

    // An utterance with clear English sentiment/stage vocabulary still
    // counts as a detection so stickiness engages from the first turn.
    if !lower.trim().is_empty() && lower.is_ascii() {
        return Some(Language::En);
    }

    None
}

fn classify_sentiment(text_lower: &str) -> f32 {
    let mut sentiment = 0.5f32;

    for &k in POSITIVE_SENTIMENT_KEYWORDS {
        if text_lower.contains(k) {
            sentiment += 0.1;
        }
    }
    for &k in NEGATIVE_SENTIMENT_KEYWORDS {
        if text_lower.contains(k) {
            sentiment -= 0.1;
        }
    }
    if INTENSIFIER_KEYWORDS.iter().any(|k| text_lower.contains(k)) {
        let positive = POSITIVE_SENTIMENT_KEYWORDS.iter().any(|k| text_lower.contains(k));
        let negative = NEGATIVE_SENTIMENT_KEYWORDS.iter().any(|k| text_lower.contains(k));
        if positive && !negative {
            sentiment += 0.05;
        } else if negative && !positive {
            sentiment -= 0.05;
        }
    }

    sentiment.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_turns_are_forced_awareness() {
        let mut state = AnalyzerState::default();
        let result = ConversationAnalyzer::analyze(&mut state, 1, "I'm ready to buy now", None);
        assert!(matches!(result.stage, Stage::Awareness));
    }

    #[test]
    fn decision_keywords_win_after_turn_three() {
        let mut state = AnalyzerState::default();
        let result = ConversationAnalyzer::analyze(&mut state, 4, "let's do it, sign up", None);
        assert!(matches!(result.stage, Stage::Decision));
    }

    #[test]
    fn late_turn_with_no_match_forces_decision() {
        let mut state = AnalyzerState::default();
        let result = ConversationAnalyzer::analyze(&mut state, 8, "okay", None);
        assert!(matches!(result.stage, Stage::Decision));
    }

    #[test]
    fn profile_sticks_once_score_threshold_is_met() {
        let mut state = AnalyzerState::default();
        let r1 = ConversationAnalyzer::analyze(&mut state, 1, "show me the data and statistics", None);
        assert!(matches!(r1.profile, CustomerProfile::Analytical));

        // Even strongly emotional language on a later turn should not move
        // the cached profile.
        let r2 = ConversationAnalyzer::analyze(&mut state, 2, "I feel so excited and happy", None);
        assert!(matches!(r2.profile, CustomerProfile::Analytical));
    }

    #[test]
    fn language_is_sticky_once_detected() {
        let mut state = AnalyzerState::default();
        let r1 = ConversationAnalyzer::analyze(&mut state, 1, "Namaste, aap kaise hain", None);
        assert!(matches!(r1.language, Language::Hinglish));

        let r2 = ConversationAnalyzer::analyze(&mut state, 2, "Yes, tell me more", None);
        assert!(matches!(r2.language, Language::Hinglish));
    }

    #[test]
    fn sentiment_clamped_and_nudged() {
        let mut state = AnalyzerState::default();
        let result = ConversationAnalyzer::analyze(&mut state, 1, "this is really great, thanks", None);
        assert!(result.sentiment > 0.5);
        assert!(result.sentiment <= 1.0);
    }

    #[test]
    fn objections_collect_all_matches() {
        let mut state = AnalyzerState::default();
        let result = ConversationAnalyzer::analyze(
            &mut state,
            4,
            "it's too expensive and I don't trust this",
            None,
        );
        assert!(result.objections.contains(&Objection::Price));
        assert!(result.objections.contains(&Objection::Trust));
    }
}
