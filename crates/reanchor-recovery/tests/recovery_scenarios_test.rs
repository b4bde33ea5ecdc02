//! End-to-end recovery scenarios over realistic document edits.
//!
//! The annotation fixtures share one paragraph. The reference always points
//! at the fox sentence; each scenario edits the document differently.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reanchor_match::{DocumentSnapshot, TierMatcher};
use reanchor_recovery::connection::{
    META_LOST, META_NEEDS_REVIEW, META_REMAP_CONFIDENCE, META_REMAP_SIMILARITY,
};
use reanchor_recovery::{
    AnnotationRecoveryOrchestrator, Chunk, Classification, Connection,
    ConnectionRemapOrchestrator, LruTtlCache, MatchMethod, MatchResult, RecoveryConfig,
    RecoveryFailure, SideRemap, StoredReference,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

const PRE: &str =
    "Chapter one. It was a bright cold day in April, and the clocks were striking thirteen. ";
const ORIGINAL: &str = "the quick brown fox jumps over the lazy sleeping dog";
const POST: &str = ". Winston Smith slipped quickly through the glass doors of Victory Mansions, though not quickly enough.";

fn original_document() -> String {
    format!("{PRE}{ORIGINAL}{POST}")
}

fn fox_reference() -> StoredReference {
    let text = original_document();
    let reference = StoredReference::capture(&text, 87, 139, None, 100);
    assert_eq!(reference.original_text, ORIGINAL);
    reference
}

fn orchestrator() -> AnnotationRecoveryOrchestrator {
    AnnotationRecoveryOrchestrator::new(RecoveryConfig::default())
}

fn span(text: &str, result: &MatchResult) -> String {
    text.chars()
        .skip(result.start_offset)
        .take(result.end_offset - result.start_offset)
        .collect()
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

#[test]
fn test_unchanged_document_recovers_exactly() {
    let text = original_document();
    let outcomes = orchestrator().recover_annotations(&[fox_reference()], &text, &[]);

    assert_eq!(outcomes.success.len(), 1);
    let result = outcomes.success[0].result.as_ref().unwrap();
    assert_eq!(result.method, MatchMethod::Exact);
    assert_eq!((result.start_offset, result.end_offset), (87, 139));
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn test_inserted_prefix_and_word_edit_recovers_by_context() {
    let inserted = "This sentence was inserted by the cleanup pass!!! ";
    let edited = "the quick brown fox jumped over the lazy sleeping dog";
    let text = format!("{inserted}{PRE}{edited}{POST}");

    let outcomes = orchestrator().recover_annotations(&[fox_reference()], &text, &[]);

    assert_eq!(outcomes.success.len(), 1, "outcomes: {:?}", outcomes.summary());
    let result = outcomes.success[0].result.as_ref().unwrap();
    assert_eq!(result.method, MatchMethod::Context);
    assert_eq!((result.start_offset, result.end_offset), (137, 190));
    assert_eq!(span(&text, result), edited);
    assert!(
        (result.confidence - 0.9806).abs() < 1e-3,
        "confidence was {}",
        result.confidence
    );
    assert!(result.context_before.ends_with("striking thirteen. "));
    assert!(result.context_after.starts_with(". Winston Smith"));
}

#[test]
fn test_rewritten_surroundings_fall_back_to_trigram_review() {
    let typo = "the quick brwn fox jumps ovr the lazy sleeping dog";
    let text = format!(
        "Summary: the story opens on a cold spring afternoon. {typo}. Later chapters follow another character entirely."
    );

    let outcomes = orchestrator().recover_annotations(&[fox_reference()], &text, &[]);

    assert_eq!(outcomes.needs_review.len(), 1, "outcomes: {:?}", outcomes.summary());
    let recovered = &outcomes.needs_review[0];
    let result = recovered.result.as_ref().unwrap();
    assert_eq!(result.method, MatchMethod::Trigram);
    assert_eq!((result.start_offset, result.end_offset), (53, 103));
    assert_eq!(span(&text, result), typo);
    assert!((result.confidence - 0.7269).abs() < 1e-3);
    assert!(recovered.failure.is_none());
}

#[test]
fn test_typos_with_kept_surroundings_stay_in_context_tier() {
    let typo = "the quick brwn fox jumps ovr the lazy sleeping dog";
    let text = format!("{PRE}{typo}{POST}");

    let outcomes = orchestrator().recover_annotations(&[fox_reference()], &text, &[]);

    assert_eq!(outcomes.success.len(), 1, "outcomes: {:?}", outcomes.summary());
    let result = outcomes.success[0].result.as_ref().unwrap();
    assert_eq!(result.method, MatchMethod::Context);
    assert_eq!((result.start_offset, result.end_offset), (87, 137));
    assert_eq!(span(&text, result), typo);
    assert!((result.confidence - 0.9567).abs() < 1e-3);
}

#[test]
fn test_deleted_passage_is_lost() {
    let text = "An entirely different document about gardening, soil acidity and compost heaps.";
    let outcomes = orchestrator().recover_annotations(&[fox_reference()], text, &[]);

    assert_eq!(outcomes.lost.len(), 1);
    let lost = &outcomes.lost[0];
    assert!(lost.result.is_none());
    assert_eq!(lost.failure, Some(RecoveryFailure::NotFound));
    assert_eq!(lost.reference.original_text, ORIGINAL);
}

#[test]
fn test_raised_success_band_moves_context_hit_to_review() {
    let inserted = "This sentence was inserted by the cleanup pass!!! ";
    let edited = "the quick brown fox jumped over the lazy sleeping dog";
    let text = format!("{inserted}{PRE}{edited}{POST}");
    let config = RecoveryConfig::default().with_annotation_success(0.99);

    let outcomes = AnnotationRecoveryOrchestrator::new(config).recover_annotations(
        &[fox_reference()],
        &text,
        &[],
    );
    assert_eq!(outcomes.needs_review.len(), 1);
    assert_eq!(outcomes.needs_review[0].method(), Some(MatchMethod::Context));
}

// =============================================================================
// ANNOTATION PROPERTIES
// =============================================================================

fn mixed_batch() -> (String, Vec<StoredReference>) {
    let text = original_document();
    let mut blank = fox_reference();
    blank.original_text = String::new();
    let references = vec![
        fox_reference(),
        StoredReference::capture(&text, 0, 12, None, 100),
        StoredReference::capture("nothing to see in this one", 0, 26, None, 100),
        blank,
        StoredReference::capture(&text, 160, 176, None, 100),
    ];
    (text, references)
}

#[test]
fn test_every_reference_lands_in_exactly_one_bucket() {
    let (text, references) = mixed_batch();
    let outcomes = orchestrator().recover_annotations(&references, &text, &[]);

    assert_eq!(outcomes.total(), references.len());
    let mut seen = HashSet::new();
    for classification in [
        Classification::Success,
        Classification::NeedsReview,
        Classification::Lost,
    ] {
        for recovered in outcomes.bucket(classification) {
            assert!(seen.insert(recovered.reference.id), "duplicate outcome");
        }
    }
    let expected: HashSet<Uuid> = references.iter().map(|r| r.id).collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_confidence_stays_in_unit_range() {
    let (text, references) = mixed_batch();
    let outcomes = orchestrator().recover_annotations(&references, &text, &[]);

    let all = outcomes
        .success
        .iter()
        .chain(&outcomes.needs_review)
        .chain(&outcomes.lost);
    for recovered in all {
        let confidence = recovered.confidence();
        assert!((0.0..=1.0).contains(&confidence), "confidence {confidence}");
    }
}

#[test]
fn test_recovery_is_idempotent_with_and_without_cache() {
    let (text, references) = mixed_batch();
    let plain = orchestrator();
    let cache = Arc::new(LruTtlCache::default());
    let cached = orchestrator().with_cache(cache.clone());

    let first = plain.recover_annotations(&references, &text, &[]);
    let second = plain.recover_annotations(&references, &text, &[]);
    let warm = cached.recover_annotations(&references, &text, &[]);
    let hot = cached.recover_annotations(&references, &text, &[]);

    assert_eq!(first, second);
    assert_eq!(first, warm);
    assert_eq!(first, hot);
    assert!(!cache.is_empty());
}

struct CountingTier {
    method: MatchMethod,
    hit: bool,
    calls: Arc<AtomicUsize>,
}

impl TierMatcher for CountingTier {
    fn method(&self) -> MatchMethod {
        self.method
    }

    fn find(
        &self,
        _reference: &StoredReference,
        _document: &DocumentSnapshot<'_>,
    ) -> Option<MatchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hit.then(|| MatchResult {
            start_offset: 0,
            end_offset: 5,
            confidence: 0.9,
            method: self.method,
            context_before: String::new(),
            context_after: String::new(),
        })
    }
}

#[test]
fn test_tiers_stop_at_first_hit() {
    let calls: Vec<Arc<AtomicUsize>> = (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let plan = [
        (MatchMethod::Exact, false),
        (MatchMethod::Context, false),
        (MatchMethod::ChunkBounded, true),
        (MatchMethod::Trigram, true),
    ];
    let tiers: Vec<Box<dyn TierMatcher>> = plan
        .iter()
        .zip(&calls)
        .map(|(&(method, hit), calls)| {
            Box::new(CountingTier {
                method,
                hit,
                calls: calls.clone(),
            }) as Box<dyn TierMatcher>
        })
        .collect();

    let orchestrator = AnnotationRecoveryOrchestrator::with_tiers(RecoveryConfig::default(), tiers);
    let outcomes = orchestrator.recover_annotations(&[fox_reference()], "hello world", &[]);

    let counts: Vec<usize> = calls.iter().map(|c| c.load(Ordering::SeqCst)).collect();
    assert_eq!(counts, vec![1, 1, 1, 0]);
    assert_eq!(outcomes.success.len(), 1);
    assert_eq!(outcomes.success[0].method(), Some(MatchMethod::ChunkBounded));
}

// =============================================================================
// CONNECTIONS
// =============================================================================

fn unit(angle: f32) -> Vec<f32> {
    vec![angle.cos(), angle.sin(), 0.0]
}

#[test]
fn test_verbatim_rechunk_remaps_both_sides() {
    let doc = Uuid::new_v4();
    let (old_a, old_b) = (Uuid::new_v4(), Uuid::new_v4());
    let retained = HashMap::from([(old_a, unit(0.2)), (old_b, unit(1.1))]);
    let new_a = Chunk::new(doc, 0, 0, 40, "first").with_embedding(unit(0.2));
    let new_b = Chunk::new(doc, 1, 40, 80, "second").with_embedding(unit(1.1));
    let conn = Connection::new(old_a, old_b, "elaborates", 0.7).with_documents(doc, doc);

    let orchestrator = ConnectionRemapOrchestrator::new(&RecoveryConfig::default());
    let outcomes = orchestrator.remap_connections(
        &[conn],
        &retained,
        doc,
        &[new_a.clone(), new_b.clone()],
    );

    assert_eq!(outcomes.success.len(), 1);
    let remapped = &outcomes.success[0];
    assert!((remapped.confidence.unwrap() - 1.0).abs() < 1e-6);
    assert_eq!(remapped.connection.source_chunk_id, new_a.id);
    assert_eq!(remapped.connection.target_chunk_id, new_b.id);
    assert!(matches!(remapped.source, SideRemap::Remapped(ref m) if m.chunk_index == 0));
    assert!(!remapped.connection.metadata.contains_key(META_NEEDS_REVIEW));
    assert!(remapped.connection.metadata.contains_key(META_REMAP_CONFIDENCE));
    assert_eq!(remapped.connection.connection_type, "elaborates");
}

#[test]
fn test_weak_candidate_marks_connection_lost() {
    let doc = Uuid::new_v4();
    let old_source = Uuid::new_v4();
    let target = Uuid::new_v4();
    let retained = HashMap::from([(old_source, unit(0.0))]);
    // cos(0.6435) ~ 0.80: above the embedding floor, below the review band
    let candidate = Chunk::new(doc, 0, 0, 40, "drifted").with_embedding(unit(0.6435));
    let conn = Connection::new(old_source, target, "cites", 1.0);

    let orchestrator = ConnectionRemapOrchestrator::new(&RecoveryConfig::default());
    let outcomes = orchestrator.remap_connections(&[conn], &retained, doc, &[candidate]);

    assert_eq!(outcomes.lost.len(), 1);
    let remapped = &outcomes.lost[0];
    assert_eq!(remapped.connection.source_chunk_id, old_source);
    assert_eq!(remapped.connection.target_chunk_id, target);
    assert_eq!(remapped.connection.metadata[META_LOST], JsonValue::Bool(true));
    let similarity = remapped.connection.metadata[META_REMAP_SIMILARITY]
        .as_f64()
        .unwrap();
    assert!((similarity - 0.80).abs() < 1e-3);
    assert!(matches!(
        remapped.failure,
        Some(RecoveryFailure::BelowThreshold { .. })
    ));
}

#[test]
fn test_connection_partition_covers_every_input() {
    let doc = Uuid::new_v4();
    let old = Uuid::new_v4();
    let retained = HashMap::from([(old, unit(0.0))]);
    let chunk = Chunk::new(doc, 0, 0, 10, "c").with_embedding(unit(0.0));
    let connections = vec![
        Connection::new(old, Uuid::new_v4(), "a", 1.0),
        Connection::new(Uuid::new_v4(), Uuid::new_v4(), "b", 1.0),
        Connection::new(Uuid::new_v4(), old, "c", 1.0).with_documents(doc, doc),
    ];

    let orchestrator = ConnectionRemapOrchestrator::new(&RecoveryConfig::default());
    let outcomes = orchestrator.remap_connections(&connections, &retained, doc, &[chunk]);

    assert_eq!(outcomes.total(), connections.len());
    let ids: HashSet<Uuid> = outcomes
        .success
        .iter()
        .chain(&outcomes.needs_review)
        .chain(&outcomes.lost)
        .map(|r| r.connection.id)
        .collect();
    assert_eq!(ids.len(), connections.len());
}
