//! `HedgeEngine`: indexed catalog of filler clips. Builds inverted indexes
//! by language/principle/profile at startup, build-once-then-serve, so
//! per-turn selection is a handful of set intersections, not a catalog scan.

use std::collections::{HashMap, HashSet};
use voxloop_core::{CustomerProfile, FillerClip, Language, Principle};

pub struct HedgeEngine {
    catalog: Vec<FillerClip>,
    by_language: HashMap<Language, HashSet<usize>>,
    by_principle: HashMap<Principle, HashSet<usize>>,
    by_profile: HashMap<CustomerProfile, HashSet<usize>>,
    /// Indices of the highest-effectiveness clips, pre-warmed into memory.
    warm_indices: Vec<usize>,
}

impl HedgeEngine {
    /// Build inverted indexes over `catalog` and pre-warm the top
    /// `prewarm_n` clips by effectiveness score. Preload is single-threaded;
    /// the engine is read-only afterward and safe to share across calls.
    pub fn new(catalog: Vec<FillerClip>, prewarm_n: usize) -> Self {
        let mut by_language: HashMap<Language, HashSet<usize>> = HashMap::new();
        let mut by_principle: HashMap<Principle, HashSet<usize>> = HashMap::new();
        let mut by_profile: HashMap<CustomerProfile, HashSet<usize>> = HashMap::new();

        for (idx, clip) in catalog.iter().enumerate() {
            for &lang in &clip.metadata.languages {
                by_language.entry(lang).or_default().insert(idx);
            }
            for &principle in &clip.metadata.principles {
                by_principle.entry(principle).or_default().insert(idx);
            }
            for &profile in &clip.metadata.profiles {
                by_profile.entry(profile).or_default().insert(idx);
            }
        }

        let mut ranked: Vec<usize> = (0..catalog.len()).collect();
        ranked.sort_by(|&a, &b| {
            catalog[b]
                .metadata
                .effectiveness
                .score()
                .partial_cmp(&catalog[a].metadata.effectiveness.score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let warm_indices = ranked.into_iter().take(prewarm_n).collect();

        tracing::info!(
            clips = catalog.len(),
            prewarmed = warm_indices.len(),
            "hedge engine catalog indexed"
        );

        Self {
            catalog,
            by_language,
            by_principle,
            by_profile,
            warm_indices,
        }
    }

    pub fn is_prewarmed(&self, clip_id: &str) -> bool {
        self.warm_indices
            .iter()
            .any(|&idx| self.catalog[idx].id == clip_id)
    }

    /// Select a filler for the current turn, avoiding clips already used
    /// this call unless doing so would leave no candidates.
    pub fn select_filler(
        &self,
        language: Language,
        principle: Principle,
        profile: CustomerProfile,
        used_set: &HashSet<String>,
    ) -> FillerClip {
        if self.catalog.is_empty() {
            return FillerClip::synthetic_silence("synthetic-silence");
        }

        // 1. Filter by language, falling back to en, then hinglish for
        // Indic languages, if the direct match is empty.
        let mut candidates = self.indices_for_language(language);
        if candidates.is_empty() && language != Language::En {
            candidates = self.indices_for_language(Language::En);
        }
        if candidates.is_empty() && is_indic(language) {
            candidates = self.indices_for_language(Language::Hinglish);
        }
        if candidates.is_empty() {
            // No language match anywhere; fall back to the whole catalog so
            // later steps still have something to work with.
            candidates = (0..self.catalog.len()).collect();
        }

        // 2. Intersect with principle (mandatory unless it empties the set).
        let principle_set = self.by_principle.get(&principle).cloned().unwrap_or_default();
        let narrowed = intersect(&candidates, &principle_set);
        if !narrowed.is_empty() {
            candidates = narrowed;
        }

        // 3. Intersect with profile (soft).
        let profile_set = self.by_profile.get(&profile).cloned().unwrap_or_default();
        let narrowed = intersect(&candidates, &profile_set);
        if !narrowed.is_empty() {
            candidates = narrowed;
        }

        // 4. Remove already-used clips unless that would empty the set.
        let unused: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&idx| !used_set.contains(&self.catalog[idx].id))
            .collect();
        if !unused.is_empty() {
            candidates = unused;
        }

        // 5. Highest completionRate * principleReinforcement wins.
        candidates
            .iter()
            .copied()
            .max_by(|&a, &b| {
                self.catalog[a]
                    .metadata
                    .effectiveness
                    .score()
                    .partial_cmp(&self.catalog[b].metadata.effectiveness.score())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|idx| self.catalog[idx].clone())
            .unwrap_or_else(|| FillerClip::synthetic_silence("synthetic-silence"))
    }

    fn indices_for_language(&self, language: Language) -> Vec<usize> {
        self.by_language
            .get(&language)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

fn intersect(a: &[usize], b: &HashSet<usize>) -> Vec<usize> {
    a.iter().copied().filter(|idx| b.contains(idx)).collect()
}

fn is_indic(language: Language) -> bool {
    matches!(
        language,
        Language::Hi | Language::Mr | Language::Ta | Language::Te | Language::Kn
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxloop_core::{FillerEffectiveness, FillerMetadata};
    use std::path::PathBuf;

    fn clip(id: &str, lang: Language, principle: Principle, score: f32) -> FillerClip {
        FillerClip {
            id: id.to_string(),
            audio_path: PathBuf::from(format!("/clips/{id}.pcm")),
            duration_sec: 2.0,
            metadata: FillerMetadata {
                languages: vec![lang],
                principles: vec![principle],
                profiles: vec![CustomerProfile::Analytical],
                tone: "neutral".into(),
                effectiveness: FillerEffectiveness {
                    completion_rate: score,
                    sentiment_lift: 0.0,
                    principle_reinforcement: 1.0,
                },
            },
        }
    }

    #[test]
    fn empty_catalog_returns_synthetic_silence() {
        let engine = HedgeEngine::new(vec![], 4);
        let clip = engine.select_filler(
            Language::En,
            Principle::Liking,
            CustomerProfile::Analytical,
            &HashSet::new(),
        );
        assert!(clip.is_synthetic_silence());
        assert_eq!(clip.duration_sec, 2.0);
    }

    #[test]
    fn prefers_highest_effectiveness() {
        let catalog = vec![
            clip("low", Language::En, Principle::Liking, 0.3),
            clip("high", Language::En, Principle::Liking, 0.9),
        ];
        let engine = HedgeEngine::new(catalog, 4);
        let selected = engine.select_filler(
            Language::En,
            Principle::Liking,
            CustomerProfile::Analytical,
            &HashSet::new(),
        );
        assert_eq!(selected.id, "high");
    }

    #[test]
    fn avoids_repeats_until_set_exhausted() {
        let catalog = vec![
            clip("a", Language::En, Principle::Liking, 0.9),
            clip("b", Language::En, Principle::Liking, 0.5),
        ];
        let engine = HedgeEngine::new(catalog, 4);
        let mut used = HashSet::new();
        used.insert("a".to_string());

        let selected = engine.select_filler(
            Language::En,
            Principle::Liking,
            CustomerProfile::Analytical,
            &used,
        );
        assert_eq!(selected.id, "b");

        used.insert("b".to_string());
        // Both used now; repetition must be allowed rather than producing
        // synthetic silence.
        let selected = engine.select_filler(
            Language::En,
            Principle::Liking,
            CustomerProfile::Analytical,
            &used,
        );
        assert_eq!(selected.id, "a");
    }

    #[test]
    fn hinglish_falls_back_through_english() {
        let catalog = vec![clip("hi-clip", Language::Hi, Principle::Liking, 0.8)];
        let engine = HedgeEngine::new(catalog, 4);
        let selected = engine.select_filler(
            Language::Hinglish,
            Principle::Liking,
            CustomerProfile::Analytical,
            &HashSet::new(),
        );
        // No hinglish or en clip exists, so selection falls through to the
        // whole catalog rather than synthetic silence.
        assert_eq!(selected.id, "hi-clip");
    }
}
