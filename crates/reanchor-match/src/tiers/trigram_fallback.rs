use reanchor_core::{MatchMethod, MatchResult, StoredReference};
use tracing::debug;

use super::{build_match, needle_chars, MatchSettings, TierMatcher};
use crate::document::DocumentSnapshot;

/// Tier 4: full-document trigram scan.
///
/// The raw similarity of the best window is multiplied by the trigram
/// penalty, and the adjusted value must reach
/// `tier_acceptance * trigram_penalty`.
#[derive(Debug, Clone, Copy)]
pub struct TrigramFallbackMatcher {
    settings: MatchSettings,
}

impl TrigramFallbackMatcher {
    pub fn new(settings: MatchSettings) -> Self {
        Self { settings }
    }
}

impl TierMatcher for TrigramFallbackMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Trigram
    }

    fn find(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
    ) -> Option<MatchResult> {
        let needle = needle_chars(reference)?;
        let scanner = &self.settings.scanner;
        let window =
            scanner.best_window(document.chars(), 0..document.len(), &scanner.needle(&needle))?;

        let thresholds = &self.settings.thresholds;
        let adjusted = window.score * thresholds.trigram_penalty;
        debug!(
            reference_id = %reference.id,
            similarity = window.score,
            confidence = adjusted,
            "Trigram fallback best window"
        );
        if adjusted < thresholds.trigram_floor() {
            return None;
        }

        Some(build_match(
            document,
            window.start,
            window.end,
            adjusted,
            MatchMethod::Trigram,
            self.settings.context_window,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "the quick brown fox jumps over the lazy sleeping dog";
    const TYPO: &str = "the quick brwn fox jumps ovr the lazy sleeping dog";

    fn reference() -> StoredReference {
        StoredReference::capture(ORIGINAL, 0, ORIGINAL.len(), None, 0)
    }

    #[test]
    fn test_penalized_confidence() {
        let text = format!("Prologue. {}. Epilogue follows here.", TYPO);
        let doc = DocumentSnapshot::new(&text, &[]);
        let m = TrigramFallbackMatcher::new(MatchSettings::default())
            .find(&reference(), &doc)
            .unwrap();

        assert_eq!(m.start_offset, 10);
        assert_eq!(m.end_offset, 10 + TYPO.len());
        assert_eq!(m.method, MatchMethod::Trigram);
        // raw 42/52, penalized by 0.9
        assert!((m.confidence - 0.7269).abs() < 1e-3);
    }

    #[test]
    fn test_unrelated_text_misses() {
        let doc = DocumentSnapshot::new(
            "Completely different prose about sailing ships and weather.",
            &[],
        );
        assert!(TrigramFallbackMatcher::new(MatchSettings::default())
            .find(&reference(), &doc)
            .is_none());
    }

    #[test]
    fn test_empty_document_misses() {
        let doc = DocumentSnapshot::new("", &[]);
        assert!(TrigramFallbackMatcher::new(MatchSettings::default())
            .find(&reference(), &doc)
            .is_none());
    }
}
