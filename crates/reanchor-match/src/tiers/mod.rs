//! The four annotation recovery tiers.
//!
//! Each tier is a [`TierMatcher`]. The orchestrator in `reanchor-recovery`
//! runs them in the order returned by [`default_tiers`] and stops at the
//! first one that produces a match; a tier returning `None` is a miss, not
//! an error.

mod chunk_bounded;
mod context;
mod exact;
mod trigram_fallback;

pub use chunk_bounded::ChunkBoundedMatcher;
pub use context::ContextGuidedMatcher;
pub use exact::ExactMatcher;
pub use trigram_fallback::TrigramFallbackMatcher;

use reanchor_core::{
    clamp_unit, AnnotationThresholds, ExactMatchPolicy, MatchMethod, MatchResult, RecoveryConfig,
    StoredReference,
};

use crate::document::DocumentSnapshot;
use crate::normalize::TextNormalizer;
use crate::scan::WindowScanner;
use crate::trigram::TrigramIndexer;

/// One strategy for relocating a reference in the current document.
pub trait TierMatcher: Send + Sync {
    /// Method recorded on matches from this tier.
    fn method(&self) -> MatchMethod;

    /// Locate `reference` in `document`, or `None` on a miss.
    ///
    /// Must be pure: the same inputs always give the same answer.
    fn find(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
    ) -> Option<MatchResult>;
}

/// Settings shared by every tier, derived from [`RecoveryConfig`].
#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    pub scanner: WindowScanner,
    pub thresholds: AnnotationThresholds,
    pub context_window: usize,
    pub exact_policy: ExactMatchPolicy,
}

impl MatchSettings {
    pub fn from_config(config: &RecoveryConfig) -> Self {
        let indexer = TrigramIndexer::new(TextNormalizer::new(config.fold_typography));
        Self {
            scanner: WindowScanner::new(indexer, config.scan),
            thresholds: config.annotation,
            context_window: config.context_window,
            exact_policy: config.exact_policy,
        }
    }

    pub fn indexer(&self) -> &TrigramIndexer {
        self.scanner.indexer()
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::from_config(&RecoveryConfig::default())
    }
}

/// The standard tier chain: exact, context, chunk-bounded, trigram.
pub fn default_tiers(config: &RecoveryConfig) -> Vec<Box<dyn TierMatcher>> {
    let settings = MatchSettings::from_config(config);
    vec![
        Box::new(ExactMatcher::new(settings)),
        Box::new(ContextGuidedMatcher::new(settings)),
        Box::new(ChunkBoundedMatcher::new(settings)),
        Box::new(TrigramFallbackMatcher::new(settings)),
    ]
}

/// Build a match for `[start, end)` with fresh context from the snapshot.
pub(crate) fn build_match(
    document: &DocumentSnapshot<'_>,
    start: usize,
    end: usize,
    confidence: f32,
    method: MatchMethod,
    context_window: usize,
) -> MatchResult {
    let context = document.context_around(start, end, context_window);
    MatchResult {
        start_offset: start,
        end_offset: end,
        confidence: clamp_unit(confidence),
        method,
        context_before: context.before,
        context_after: context.after,
    }
}

/// Original text as chars, or `None` when it is blank.
pub(crate) fn needle_chars(reference: &StoredReference) -> Option<Vec<char>> {
    if reference.original_text.trim().is_empty() {
        return None;
    }
    Some(reference.original_text.chars().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tier_order() {
        let tiers = default_tiers(&RecoveryConfig::default());
        let methods: Vec<MatchMethod> = tiers.iter().map(|t| t.method()).collect();
        assert_eq!(
            methods,
            vec![
                MatchMethod::Exact,
                MatchMethod::Context,
                MatchMethod::ChunkBounded,
                MatchMethod::Trigram,
            ]
        );
    }

    #[test]
    fn test_settings_follow_config() {
        let config = RecoveryConfig::default()
            .with_fold_typography(false)
            .with_context_window(40);
        let settings = MatchSettings::from_config(&config);
        assert!(!settings.indexer().normalizer().folds_typography());
        assert_eq!(settings.context_window, 40);
    }

    #[test]
    fn test_build_match_clamps_confidence() {
        let doc = DocumentSnapshot::new("alpha beta gamma", &[]);
        let m = build_match(&doc, 6, 10, 1.7, MatchMethod::Trigram, 3);
        assert_eq!(m.confidence, 1.0);
        assert_eq!(m.context_before, "ha ");
        assert_eq!(m.context_after, " ga");
    }
}
