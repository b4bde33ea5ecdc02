use reanchor_core::{MatchMethod, MatchResult, StoredReference};
use tracing::debug;

use super::{build_match, needle_chars, MatchSettings, TierMatcher};
use crate::document::DocumentSnapshot;

/// Tier 3: windowed trigram search limited to the hinted chunk.
///
/// The reference's `original_chunk_index` selects the current chunk with the
/// same index; only that chunk's character range is scanned. A missing hint,
/// a missing chunk or a chunk range outside the text is a miss.
#[derive(Debug, Clone, Copy)]
pub struct ChunkBoundedMatcher {
    settings: MatchSettings,
}

impl ChunkBoundedMatcher {
    pub fn new(settings: MatchSettings) -> Self {
        Self { settings }
    }
}

impl TierMatcher for ChunkBoundedMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::ChunkBounded
    }

    fn find(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
    ) -> Option<MatchResult> {
        let chunk_index = reference.original_chunk_index?;
        let needle = needle_chars(reference)?;

        let Some(chunk) = document.chunk_by_index(chunk_index) else {
            debug!(reference_id = %reference.id, chunk_index, "Hinted chunk not present");
            return None;
        };
        let Some(range) = document.chunk_range(chunk) else {
            debug!(
                reference_id = %reference.id,
                chunk_id = %chunk.id,
                "Hinted chunk range outside document"
            );
            return None;
        };

        let scanner = &self.settings.scanner;
        let window = scanner.best_window(document.chars(), range, &scanner.needle(&needle))?;
        debug!(
            reference_id = %reference.id,
            chunk_id = %chunk.id,
            similarity = window.score,
            "Chunk-bounded best window"
        );
        if window.score < self.settings.thresholds.tier_acceptance {
            return None;
        }

        Some(build_match(
            document,
            window.start,
            window.end,
            window.score,
            MatchMethod::ChunkBounded,
            self.settings.context_window,
        ))
    }
}
