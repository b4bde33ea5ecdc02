//! Snapshot-fetching front end over the two orchestrators.
//!
//! The service reads the current text, current chunks and retained
//! embeddings of a document once per batch and hands that snapshot to the
//! pure orchestrators. It never writes: persisting the outcome is left to
//! the caller.

use std::sync::Arc;
use std::time::Instant;

use reanchor_core::{
    ChunkRepository, Connection, DocumentTextSource, MatchCache, RecoveredAnnotation,
    RecoveryConfig, RecoveryOutcomeSet, RemappedConnection, Result, StoredReference,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::annotation::AnnotationRecoveryOrchestrator;
use crate::connection::ConnectionRemapOrchestrator;

/// Result of remapping the connections of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemapReport {
    pub outcomes: RecoveryOutcomeSet<RemappedConnection>,
    /// Connections left alone because no user validated them
    pub skipped_unvalidated: Vec<Uuid>,
}

/// Recovery entry point bound to a chunk repository and a text source.
pub struct RecoveryService<R, D> {
    chunks: R,
    documents: D,
    annotations: AnnotationRecoveryOrchestrator,
    connections: ConnectionRemapOrchestrator,
}

impl<R, D> RecoveryService<R, D>
where
    R: ChunkRepository,
    D: DocumentTextSource,
{
    pub fn new(chunks: R, documents: D, config: RecoveryConfig) -> Self {
        let connections = ConnectionRemapOrchestrator::new(&config);
        Self {
            chunks,
            documents,
            annotations: AnnotationRecoveryOrchestrator::new(config),
            connections,
        }
    }

    /// Attach a match cache to annotation recovery.
    pub fn with_cache(mut self, cache: Arc<dyn MatchCache>) -> Self {
        self.annotations = self.annotations.with_cache(cache);
        self
    }

    pub fn config(&self) -> &RecoveryConfig {
        self.annotations.config()
    }

    /// Recover `references` against the current state of `document_id`.
    #[instrument(skip(self, references, document_id), fields(
        subsystem = "recovery",
        component = "recovery_service",
        op = "recover_document_annotations",
        document_id = %document_id,
        input_count = references.len(),
    ))]
    pub async fn recover_document_annotations(
        &self,
        document_id: Uuid,
        references: &[StoredReference],
    ) -> Result<RecoveryOutcomeSet<RecoveredAnnotation>> {
        let start = Instant::now();
        let text = self.documents.current_text(document_id).await.map_err(|e| {
            error!(error = %e, "Failed to load document text");
            e
        })?;
        let chunks = self.chunks.current_chunks(document_id).await.map_err(|e| {
            error!(error = %e, "Failed to load current chunks");
            e
        })?;

        let outcomes = self.annotations.recover_annotations(references, &text, &chunks);

        info!(
            chunk_count = chunks.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Document annotations recovered"
        );
        Ok(outcomes)
    }

    /// Remap the user-validated connections touching `document_id`.
    ///
    /// Unvalidated connections are not remapped; their ids are listed in
    /// [`RemapReport::skipped_unvalidated`].
    #[instrument(skip(self, connections, document_id), fields(
        subsystem = "recovery",
        component = "recovery_service",
        op = "remap_document_connections",
        document_id = %document_id,
        input_count = connections.len(),
    ))]
    pub async fn remap_document_connections(
        &self,
        document_id: Uuid,
        connections: &[Connection],
    ) -> Result<RemapReport> {
        let start = Instant::now();
        let chunks = self.chunks.current_chunks(document_id).await.map_err(|e| {
            error!(error = %e, "Failed to load current chunks");
            e
        })?;
        let retained = self
            .chunks
            .retained_embeddings(document_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load retained embeddings");
                e
            })?;

        let (validated, skipped): (Vec<Connection>, Vec<Connection>) = connections
            .iter()
            .cloned()
            .partition(|c| c.user_validated);
        let skipped_unvalidated: Vec<Uuid> = skipped.iter().map(|c| c.id).collect();

        let outcomes = self
            .connections
            .remap_connections(&validated, &retained, document_id, &chunks);

        info!(
            retained_count = retained.len(),
            skipped_count = skipped_unvalidated.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Document connections remapped"
        );
        Ok(RemapReport {
            outcomes,
            skipped_unvalidated,
        })
    }
}
