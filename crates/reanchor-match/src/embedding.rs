//! Embedding-based chunk matching for connection remapping.

use reanchor_core::{clamp_unit, defaults, Chunk, EmbeddingMatch, RecoveryConfig, Result};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::vector::{cosine_similarity, validate_vector};

/// Finds the current chunk whose embedding is closest to a superseded one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingSimilarityMatcher {
    floor: f32,
}

impl Default for EmbeddingSimilarityMatcher {
    fn default() -> Self {
        Self::new(defaults::EMBEDDING_FLOOR)
    }
}

impl EmbeddingSimilarityMatcher {
    pub fn new(floor: f32) -> Self {
        Self { floor }
    }

    pub fn from_config(config: &RecoveryConfig) -> Self {
        Self::new(config.connection.embedding_floor)
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Highest-scoring candidate for `old_embedding` among the current
    /// chunks of `document_id` that carry an embedding, floor or not.
    ///
    /// Ties go to the lowest `chunk_index`. A corrupt old vector is an
    /// error for this item. Candidates whose own vector is corrupt or of
    /// another dimension are skipped.
    pub fn best_candidate(
        &self,
        old_embedding: &[f32],
        document_id: Uuid,
        candidates: &[Chunk],
    ) -> Result<Option<EmbeddingMatch>> {
        validate_vector(old_embedding)?;

        let mut eligible: Vec<(&Chunk, &Vec<f32>)> = candidates
            .iter()
            .filter(|c| c.is_current && c.document_id == document_id)
            .filter_map(|c| c.embedding.as_ref().map(|e| (c, e)))
            .collect();
        eligible.sort_by_key(|(c, _)| c.chunk_index);

        let mut best: Option<EmbeddingMatch> = None;
        for (chunk, embedding) in eligible {
            let similarity = match cosine_similarity(old_embedding, embedding) {
                Ok(s) => clamp_unit(s),
                Err(e) => {
                    warn!(
                        chunk_id = %chunk.id,
                        chunk_index = chunk.chunk_index,
                        error = %e,
                        "Skipping candidate with unusable embedding"
                    );
                    continue;
                }
            };
            trace!(chunk_id = %chunk.id, similarity, "Embedding candidate");
            if best.map_or(true, |b| similarity > b.similarity) {
                best = Some(EmbeddingMatch {
                    chunk_id: chunk.id,
                    chunk_index: chunk.chunk_index,
                    similarity,
                });
            }
        }

        Ok(best)
    }

    /// Like [`best_candidate`](Self::best_candidate), but `Ok(None)` when
    /// the best score is under the floor.
    pub fn best_match(
        &self,
        old_embedding: &[f32],
        document_id: Uuid,
        candidates: &[Chunk],
    ) -> Result<Option<EmbeddingMatch>> {
        let best = self.best_candidate(old_embedding, document_id, candidates)?;
        Ok(best.filter(|m| self.clears_floor(m)))
    }

    pub fn clears_floor(&self, candidate: &EmbeddingMatch) -> bool {
        candidate.similarity >= self.floor
    }
}
