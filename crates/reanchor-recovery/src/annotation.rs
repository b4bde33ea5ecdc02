//! Annotation recovery orchestration.
//!
//! Each reference runs through the tier chain
//! `exact -> context -> chunk_bounded -> trigram -> not found`, stopping at
//! the first tier that matches. The match confidence is then classified into
//! success / needs_review / lost. A malformed reference is isolated as lost
//! and never aborts the batch.

use std::sync::Arc;
use std::time::Instant;

use reanchor_core::{
    classify_annotation, CachedMatch, Chunk, Classification, MatchCache, MatchResult,
    RecoveredAnnotation, RecoveryConfig, RecoveryFailure, RecoveryOutcomeSet, Result,
    StoredReference,
};
use reanchor_match::{default_tiers, DocumentSnapshot, TierMatcher};
use tracing::{debug, info, instrument, warn};

use crate::cache::{cache_key, snapshot_fingerprint};

/// Runs the tier chain over a batch of stored references.
pub struct AnnotationRecoveryOrchestrator {
    tiers: Vec<Box<dyn TierMatcher>>,
    config: RecoveryConfig,
    cache: Option<Arc<dyn MatchCache>>,
}

impl AnnotationRecoveryOrchestrator {
    /// Orchestrator with the standard four tiers.
    pub fn new(config: RecoveryConfig) -> Self {
        let tiers = default_tiers(&config);
        Self::with_tiers(config, tiers)
    }

    /// Orchestrator with a custom tier chain, tried in the given order.
    pub fn with_tiers(config: RecoveryConfig, tiers: Vec<Box<dyn TierMatcher>>) -> Self {
        Self {
            tiers,
            config,
            cache: None,
        }
    }

    /// Attach a match cache.
    pub fn with_cache(mut self, cache: Arc<dyn MatchCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// First tier match for one reference, or `Ok(None)` when every tier
    /// misses. Errors only for a malformed reference.
    pub fn recover_one(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
    ) -> Result<Option<MatchResult>> {
        reference.validate()?;

        for tier in &self.tiers {
            if let Some(result) = tier.find(reference, document) {
                debug!(
                    reference_id = %reference.id,
                    method = %result.method,
                    confidence = result.confidence,
                    "Tier matched"
                );
                return Ok(Some(result));
            }
            debug!(reference_id = %reference.id, method = %tier.method(), "Tier missed");
        }
        Ok(None)
    }

    fn recover_cached(
        &self,
        reference: &StoredReference,
        document: &DocumentSnapshot<'_>,
        snapshot: Option<&str>,
    ) -> Result<Option<MatchResult>> {
        let (Some(cache), Some(snapshot)) = (self.cache.as_ref(), snapshot) else {
            return self.recover_one(reference, document);
        };

        let key = cache_key(snapshot, reference);
        if let Some(cached) = cache.get(&key) {
            debug!(reference_id = %reference.id, cache_hit = true, "Match served from cache");
            return Ok(cached.result);
        }

        let result = self.recover_one(reference, document)?;
        cache.set(
            key,
            CachedMatch {
                result: result.clone(),
            },
        );
        Ok(result)
    }

    /// Classify one reference's outcome.
    fn settle(
        &self,
        reference: &StoredReference,
        outcome: Result<Option<MatchResult>>,
    ) -> (Classification, RecoveredAnnotation) {
        let thresholds = &self.config.annotation;
        match outcome {
            Ok(Some(result)) => {
                let classification = classify_annotation(Some(result.confidence), thresholds);
                let failure = (classification == Classification::Lost).then(|| {
                    RecoveryFailure::BelowThreshold {
                        confidence: result.confidence,
                    }
                });
                (
                    classification,
                    RecoveredAnnotation {
                        reference: reference.clone(),
                        result: Some(result),
                        failure,
                    },
                )
            }
            Ok(None) => (
                Classification::Lost,
                RecoveredAnnotation {
                    reference: reference.clone(),
                    result: None,
                    failure: Some(RecoveryFailure::NotFound),
                },
            ),
            Err(e) => {
                warn!(reference_id = %reference.id, error = %e, "Reference isolated as lost");
                (
                    Classification::Lost,
                    RecoveredAnnotation {
                        reference: reference.clone(),
                        result: None,
                        failure: Some(RecoveryFailure::from_error(&e)),
                    },
                )
            }
        }
    }

    /// Recover every reference against one document snapshot.
    ///
    /// The returned partition always holds exactly one entry per input
    /// reference. `chunks` must be the current chunk list belonging to
    /// `document_text`.
    #[instrument(skip(self, references, document_text, chunks), fields(
        subsystem = "recovery",
        component = "annotation_orchestrator",
        op = "recover_annotations",
        input_count = references.len(),
        chunk_count = chunks.len(),
    ))]
    pub fn recover_annotations(
        &self,
        references: &[StoredReference],
        document_text: &str,
        chunks: &[Chunk],
    ) -> RecoveryOutcomeSet<RecoveredAnnotation> {
        let start = Instant::now();
        let document = DocumentSnapshot::new(document_text, chunks);
        let snapshot = self
            .cache
            .as_ref()
            .map(|_| snapshot_fingerprint(document_text, chunks, &self.config));

        let mut outcomes = RecoveryOutcomeSet::new();
        for reference in references {
            let outcome = self.recover_cached(reference, &document, snapshot.as_deref());
            let (classification, recovered) = self.settle(reference, outcome);
            outcomes.push(classification, recovered);
        }

        let summary = outcomes.summary();
        info!(
            success_count = summary.success,
            review_count = summary.needs_review,
            lost_count = summary.lost,
            duration_ms = start.elapsed().as_millis() as u64,
            "Annotation recovery completed"
        );
        outcomes
    }
}
