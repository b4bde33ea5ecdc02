use reanchor_core::{MatchMethod, MatchResult, StoredReference};
use tracing::{debug, trace};

use super::{build_match, needle_chars, MatchSettings, TierMatcher};
use crate::document::DocumentSnapshot;
use crate::scan::Window;

/// Tier 2: locate the span by its captured surroundings.
///
/// Scans the document for the window most similar to
/// `before + text + after`, then finds the text portion inside that window.
/// Both the combined window and the text portion must clear the tier
/// threshold; confidence is the combined-window similarity.
#[derive(Debug, Clone, Copy)]
pub struct ContextGuidedMatcher {
    settings: MatchSettings,
}

impl ContextGuidedMatcher {
    pub fn new(settings: MatchSettings) -> Self {
        Self { settings }
    }

    /// Position of the text portion within the winning outer window.
    fn locate_inner(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
        outer: Window,
        needle: &[char],
    ) -> Option<(usize, usize)> {
        let expected = outer.start + reference.text_context.before.chars().count();
        let slack = needle.len() / 2;
        let search_start = outer.start.saturating_sub(slack);
        let search_end = (outer.end + slack).min(document.len());

        let nearest = document
            .find_in_range(needle, search_start..search_end)
            .into_iter()
            .min_by_key(|&start| start.abs_diff(expected));
        if let Some(start) = nearest {
            return Some((start, start + needle.len()));
        }

        let scanner = &self.settings.scanner;
        let inner =
            scanner.best_window(document.chars(), outer.start..outer.end, &scanner.needle(needle))?;
        trace!(
            start = inner.start,
            end = inner.end,
            similarity = inner.score,
            "Context tier inner window"
        );
        if inner.score < self.settings.thresholds.tier_acceptance {
            return None;
        }
        Some((inner.start, inner.end))
    }
}

impl TierMatcher for ContextGuidedMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Context
    }

    fn find(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
    ) -> Option<MatchResult> {
        if reference.text_context.is_empty() {
            debug!(reference_id = %reference.id, "No captured context, skipping context tier");
            return None;
        }
        let needle = needle_chars(reference)?;

        let context = &reference.text_context;
        let combined: Vec<char> = context
            .before
            .chars()
            .chain(reference.original_text.chars())
            .chain(context.after.chars())
            .collect();

        let scanner = &self.settings.scanner;
        let outer =
            scanner.best_window(document.chars(), 0..document.len(), &scanner.needle(&combined))?;
        debug!(
            reference_id = %reference.id,
            similarity = outer.score,
            "Context tier best window"
        );
        if outer.score < self.settings.thresholds.tier_acceptance {
            return None;
        }

        let (start, end) = self.locate_inner(reference, document, outer, &needle)?;
        Some(build_match(
            document,
            start,
            end,
            outer.score,
            MatchMethod::Context,
            self.settings.context_window,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reanchor_core::TextContext;

    fn matcher() -> ContextGuidedMatcher {
        ContextGuidedMatcher::new(MatchSettings::default())
    }

    #[test]
    fn test_skipped_without_context() {
        let mut reference = StoredReference::capture("some text here", 5, 9, None, 10);
        reference.text_context = TextContext::default();
        let doc = DocumentSnapshot::new("some text here", &[]);
        assert!(matcher().find(&reference, &doc).is_none());
    }

    #[test]
    fn test_finds_shifted_span_by_context() {
        let original = "The committee met on Tuesday. It approved the annual budget \
                        without changes. Members then adjourned for lunch.";
        let start = original.find("It approved").unwrap();
        let end = start + "It approved the annual budget".len();
        let reference = StoredReference::capture(original, start, end, None, 30);

        let inserted = format!("Editor's note: minor formatting fixes applied. {}", original);
        let doc = DocumentSnapshot::new(&inserted, &[]);
        let m = matcher().find(&reference, &doc).unwrap();

        let shift = "Editor's note: minor formatting fixes applied. ".len();
        assert_eq!(m.start_offset, start + shift);
        assert_eq!(m.end_offset, end + shift);
        assert_eq!(m.method, MatchMethod::Context);
        assert!(m.confidence >= 0.75);
    }

    #[test]
    fn test_deleted_text_is_not_recovered_from_context_alone() {
        let original = "The committee met on Tuesday. It approved the annual budget \
                        without changes. Members then adjourned for lunch.";
        let start = original.find("It approved").unwrap();
        let end = start + "It approved the annual budget".len();
        let reference = StoredReference::capture(original, start, end, None, 30);

        let edited = original.replace("It approved the annual budget", "");
        let doc = DocumentSnapshot::new(&edited, &[]);
        assert!(matcher().find(&reference, &doc).is_none());
    }
}
