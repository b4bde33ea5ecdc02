use reanchor_core::{ExactMatchPolicy, MatchMethod, MatchResult, StoredReference};
use tracing::debug;

use super::{build_match, needle_chars, MatchSettings, TierMatcher};
use crate::document::DocumentSnapshot;

/// Tier 1: literal substring search.
///
/// The leftmost occurrence wins with confidence 1.0 unless the settings ask
/// for [`ExactMatchPolicy::PreferContext`], in which case the occurrence
/// whose surroundings best resemble the captured context is chosen.
#[derive(Debug, Clone, Copy)]
pub struct ExactMatcher {
    settings: MatchSettings,
}

impl ExactMatcher {
    pub fn new(settings: MatchSettings) -> Self {
        Self { settings }
    }

    /// Trigram similarity of the text surrounding `start..end` to the
    /// captured context of `reference`.
    fn context_score(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
        start: usize,
        end: usize,
    ) -> f32 {
        let captured = &reference.text_context;
        let before_len = captured.before.chars().count();
        let after_len = captured.after.chars().count();
        let around = document.context_around(start, end, before_len.max(after_len));

        let indexer = self.settings.indexer();
        let expected = format!("{} {}", captured.before, captured.after);
        let actual = format!(
            "{} {}",
            tail_chars(&around.before, before_len),
            head_chars(&around.after, after_len)
        );
        indexer.index(&expected).similarity(&indexer.index(&actual))
    }

    fn pick(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
        hits: &[usize],
        len: usize,
    ) -> usize {
        if self.settings.exact_policy == ExactMatchPolicy::Leftmost
            || reference.text_context.is_empty()
        {
            return hits[0];
        }

        let mut best = hits[0];
        let mut best_score = f32::MIN;
        for &start in hits {
            let score = self.context_score(reference, document, start, start + len);
            if score > best_score {
                best = start;
                best_score = score;
            }
        }
        best
    }
}

fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

fn head_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

impl TierMatcher for ExactMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Exact
    }

    fn find(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
    ) -> Option<MatchResult> {
        let needle = needle_chars(reference)?;
        let hits = document.find_all(&needle);
        if hits.is_empty() {
            return None;
        }

        if hits.len() > 1 {
            debug!(
                reference_id = %reference.id,
                occurrences = hits.len(),
                policy = %self.settings.exact_policy,
                "Exact text occurs more than once"
            );
        }

        let start = self.pick(reference, document, &hits, needle.len());
        Some(build_match(
            document,
            start,
            start + needle.len(),
            1.0,
            MatchMethod::Exact,
            self.settings.context_window,
        ))
    }
}
