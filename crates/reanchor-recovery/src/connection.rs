//! Connection remapping after a document is re-chunked.
//!
//! A connection links two chunks. When either chunk was superseded by
//! reprocessing, its retained embedding is matched against the new chunk
//! set and the connection is pointed at the closest new chunk. The combined
//! confidence is the weaker of the two sides.
//!
//! ## Metadata written
//!
//! | Outcome | Chunk ids | Metadata |
//! |---------|-----------|----------|
//! | success | updated | `remap_confidence` (only when a side was remapped) |
//! | needs_review | updated | `remap_confidence`, `needs_review`, `original_*_chunk_id` |
//! | lost | untouched | `lost`, `remap_similarity` (null without a candidate) |
//!
//! A side whose best candidate scores under the embedding floor makes the
//! connection lost, with that score kept as `remap_similarity`.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use reanchor_core::{
    classify_connection, Chunk, Classification, Connection, ConnectionThresholds, Error,
    RecoveryConfig, RecoveryFailure, RecoveryOutcomeSet, RemappedConnection, Result, SideRemap,
};
use reanchor_match::EmbeddingSimilarityMatcher;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub const META_LOST: &str = "lost";
pub const META_NEEDS_REVIEW: &str = "needs_review";
pub const META_REMAP_SIMILARITY: &str = "remap_similarity";
pub const META_REMAP_CONFIDENCE: &str = "remap_confidence";
pub const META_ORIGINAL_SOURCE: &str = "original_source_chunk_id";
pub const META_ORIGINAL_TARGET: &str = "original_target_chunk_id";

/// Snapshot of the reprocessed document a batch is remapped against.
struct RemapContext<'a> {
    document_id: Uuid,
    retained: &'a HashMap<Uuid, Vec<f32>>,
    new_chunks: &'a [Chunk],
    current_ids: HashSet<Uuid>,
}

/// Remaps connections whose endpoints were superseded.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionRemapOrchestrator {
    matcher: EmbeddingSimilarityMatcher,
    thresholds: ConnectionThresholds,
}

impl ConnectionRemapOrchestrator {
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            matcher: EmbeddingSimilarityMatcher::from_config(config),
            thresholds: config.connection,
        }
    }

    pub fn thresholds(&self) -> &ConnectionThresholds {
        &self.thresholds
    }

    fn resolve_side(
        &self,
        ctx: &RemapContext<'_>,
        chunk_id: Uuid,
        side_document: Option<Uuid>,
    ) -> Result<SideRemap> {
        let superseded = ctx.retained.contains_key(&chunk_id)
            || (side_document == Some(ctx.document_id) && !ctx.current_ids.contains(&chunk_id));
        if !superseded {
            return Ok(SideRemap::Unchanged);
        }

        let old = ctx.retained.get(&chunk_id).ok_or_else(|| {
            Error::MalformedInput(format!(
                "chunk {} was superseded but has no retained embedding",
                chunk_id
            ))
        })?;

        let side = match self.matcher.best_candidate(old, ctx.document_id, ctx.new_chunks)? {
            Some(m) if self.matcher.clears_floor(&m) => SideRemap::Remapped(m),
            Some(m) => SideRemap::BelowFloor(m),
            None => SideRemap::NoCandidate,
        };
        Ok(side)
    }

    fn resolve(
        &self,
        ctx: &RemapContext<'_>,
        connection: &Connection,
    ) -> Result<(SideRemap, SideRemap)> {
        let source = self.resolve_side(
            ctx,
            connection.source_chunk_id,
            connection.source_document_id,
        )?;
        let target = self.resolve_side(
            ctx,
            connection.target_chunk_id,
            connection.target_document_id,
        )?;
        Ok((source, target))
    }

    /// Remap one connection; never fails, errors classify the item lost.
    fn remap_one(
        &self,
        ctx: &RemapContext<'_>,
        connection: &Connection,
    ) -> (Classification, RemappedConnection) {
        let (source, target) = match self.resolve(ctx, connection) {
            Ok(sides) => sides,
            Err(e) => {
                warn!(connection_id = %connection.id, error = %e, "Connection isolated as lost");
                let mut updated = connection.clone();
                mark_lost(&mut updated, None);
                return (
                    Classification::Lost,
                    RemappedConnection {
                        connection: updated,
                        source: SideRemap::NoCandidate,
                        target: SideRemap::NoCandidate,
                        confidence: None,
                        failure: Some(RecoveryFailure::from_error(&e)),
                    },
                );
            }
        };

        let confidence = match (source.similarity(), target.similarity()) {
            (Some(s), Some(t)) => Some(s.min(t)),
            _ => None,
        };
        let classification = if source.is_below_floor() || target.is_below_floor() {
            Classification::Lost
        } else {
            classify_connection(confidence, &self.thresholds)
        };
        debug!(
            connection_id = %connection.id,
            confidence = confidence.unwrap_or(0.0),
            classification = %classification,
            "Connection classified"
        );

        let mut updated = connection.clone();
        let failure = match (classification, confidence) {
            (Classification::Lost, None) => {
                mark_lost(&mut updated, None);
                Some(RecoveryFailure::NotFound)
            }
            (Classification::Lost, Some(c)) => {
                mark_lost(&mut updated, Some(c));
                Some(RecoveryFailure::BelowThreshold { confidence: c })
            }
            (Classification::NeedsReview, Some(c)) => {
                let metadata = &mut updated.metadata;
                metadata.insert(META_NEEDS_REVIEW.to_string(), JsonValue::Bool(true));
                metadata.insert(
                    META_ORIGINAL_SOURCE.to_string(),
                    json!(connection.source_chunk_id.to_string()),
                );
                metadata.insert(
                    META_ORIGINAL_TARGET.to_string(),
                    json!(connection.target_chunk_id.to_string()),
                );
                apply_remap(&mut updated, &source, &target, c);
                None
            }
            (_, c) => {
                if source.is_remapped() || target.is_remapped() {
                    apply_remap(&mut updated, &source, &target, c.unwrap_or(1.0));
                }
                None
            }
        };

        (
            classification,
            RemappedConnection {
                connection: updated,
                source,
                target,
                confidence,
                failure,
            },
        )
    }

    /// Remap every connection against one reprocessed document.
    ///
    /// `retained` maps superseded chunk ids of `document_id` to their
    /// embeddings; `new_chunks` is the current chunk generation. The
    /// returned partition holds exactly one entry per input connection.
    #[instrument(skip(self, connections, retained, document_id, new_chunks), fields(
        subsystem = "recovery",
        component = "connection_orchestrator",
        op = "remap_connections",
        document_id = %document_id,
        input_count = connections.len(),
        chunk_count = new_chunks.len(),
    ))]
    pub fn remap_connections(
        &self,
        connections: &[Connection],
        retained: &HashMap<Uuid, Vec<f32>>,
        document_id: Uuid,
        new_chunks: &[Chunk],
    ) -> RecoveryOutcomeSet<RemappedConnection> {
        let start = Instant::now();
        let ctx = RemapContext {
            document_id,
            retained,
            new_chunks,
            current_ids: new_chunks
                .iter()
                .filter(|c| c.is_current)
                .map(|c| c.id)
                .collect(),
        };

        let mut outcomes = RecoveryOutcomeSet::new();
        for connection in connections {
            let (classification, remapped) = self.remap_one(&ctx, connection);
            outcomes.push(classification, remapped);
        }

        let summary = outcomes.summary();
        info!(
            success_count = summary.success,
            review_count = summary.needs_review,
            lost_count = summary.lost,
            duration_ms = start.elapsed().as_millis() as u64,
            "Connection remap completed"
        );
        outcomes
    }
}

fn mark_lost(connection: &mut Connection, similarity: Option<f32>) {
    let metadata = &mut connection.metadata;
    metadata.insert(META_LOST.to_string(), JsonValue::Bool(true));
    metadata.insert(
        META_REMAP_SIMILARITY.to_string(),
        similarity.map_or(JsonValue::Null, |s| json!(s)),
    );
}

fn apply_remap(connection: &mut Connection, source: &SideRemap, target: &SideRemap, confidence: f32) {
    if let SideRemap::Remapped(m) = source {
        connection.source_chunk_id = m.chunk_id;
    }
    if let SideRemap::Remapped(m) = target {
        connection.target_chunk_id = m.chunk_id;
    }
    connection
        .metadata
        .insert(META_REMAP_CONFIDENCE.to_string(), json!(confidence));
}
