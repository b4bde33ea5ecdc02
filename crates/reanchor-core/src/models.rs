//! Core data models for reanchor.
//!
//! All offsets are character offsets (Unicode scalar values) into the
//! document text snapshot they were computed from, never byte offsets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use uuid::Uuid;

use crate::classify::Classification;
use crate::error::{Error, Result};

fn default_true() -> bool {
    true
}

// =============================================================================
// CHUNKS
// =============================================================================

/// A contiguous, offset-addressed segment of extracted document text.
///
/// Superseded chunks (`is_current = false`) are retained after reprocessing
/// so their embeddings stay available for connection remapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    /// Sequence position within the document generation
    pub chunk_index: u32,
    /// Inclusive start character offset
    pub start_offset: usize,
    /// Exclusive end character offset
    pub end_offset: usize,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default = "default_true")]
    pub is_current: bool,
}

impl Chunk {
    /// Create a current chunk without an embedding.
    pub fn new(
        document_id: Uuid,
        chunk_index: u32,
        start_offset: usize,
        end_offset: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            chunk_index,
            start_offset,
            end_offset,
            content: content.into(),
            embedding: None,
            is_current: true,
        }
    }

    /// Attach an embedding vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Whether `start_offset < end_offset`.
    pub fn has_valid_range(&self) -> bool {
        self.start_offset < self.end_offset
    }
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

/// Text captured on either side of a span when it was created.
///
/// `before` ends exactly where the span starts and `after` begins exactly
/// where it ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContext {
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
}

impl TextContext {
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
        }
    }

    /// Capture up to `window` characters on each side of `[start, end)`.
    ///
    /// Offsets past the end of `text` are clamped.
    pub fn capture(text: &str, start: usize, end: usize, window: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        Self::capture_chars(&chars, start, end, window)
    }

    /// Same as [`TextContext::capture`] over an already decoded char buffer.
    pub fn capture_chars(chars: &[char], start: usize, end: usize, window: usize) -> Self {
        let len = chars.len();
        let start = start.min(len);
        let end = end.clamp(start, len);
        let before_start = start.saturating_sub(window);
        let after_end = end.saturating_add(window).min(len);
        Self {
            before: chars[before_start..start].iter().collect(),
            after: chars[end..after_end].iter().collect(),
        }
    }

    /// True when neither side carries any non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.before.trim().is_empty() && self.after.trim().is_empty()
    }
}

/// A user-anchored reference to a text span (an annotation).
///
/// Immutable once created: recovery produces a new position alongside the
/// original capture and never rewrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReference {
    pub id: Uuid,
    pub original_text: String,
    #[serde(default)]
    pub text_context: TextContext,
    pub original_start_offset: usize,
    pub original_end_offset: usize,
    /// Chunk the span lived in when captured; may be stale after reprocessing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_chunk_index: Option<u32>,
}

impl StoredReference {
    /// Capture a reference to `[start, end)` of `text`, including context.
    pub fn capture(
        text: &str,
        start: usize,
        end: usize,
        chunk_index: Option<u32>,
        context_window: usize,
    ) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let start = start.min(chars.len());
        let end = end.clamp(start, chars.len());
        Self {
            id: Uuid::new_v4(),
            original_text: chars[start..end].iter().collect(),
            text_context: TextContext::capture_chars(&chars, start, end, context_window),
            original_start_offset: start,
            original_end_offset: end,
            original_chunk_index: chunk_index,
        }
    }

    /// Check the fields recovery depends on.
    pub fn validate(&self) -> Result<()> {
        if self.original_text.trim().is_empty() {
            return Err(Error::MalformedInput(format!(
                "reference {} has no original_text",
                self.id
            )));
        }
        if self.original_start_offset > self.original_end_offset {
            return Err(Error::MalformedInput(format!(
                "reference {} has inverted offsets {}..{}",
                self.id, self.original_start_offset, self.original_end_offset
            )));
        }
        Ok(())
    }
}

// =============================================================================
// MATCH RESULTS
// =============================================================================

/// Which annotation tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Context,
    ChunkBounded,
    Trigram,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Context => "context",
            Self::ChunkBounded => "chunk_bounded",
            Self::Trigram => "trigram",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovered span position in the current document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub start_offset: usize,
    pub end_offset: usize,
    /// Always within `[0, 1]`
    pub confidence: f32,
    pub method: MatchMethod,
    pub context_before: String,
    pub context_after: String,
}

/// Best current chunk for an old chunk embedding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatch {
    pub chunk_id: Uuid,
    pub chunk_index: u32,
    /// Cosine similarity clamped to `[0, 1]`
    pub similarity: f32,
}

// =============================================================================
// CONNECTIONS
// =============================================================================

/// A stored semantic link between two chunks, possibly across documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub source_chunk_id: Uuid,
    pub target_chunk_id: Uuid,
    /// Document the source chunk belongs to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document_id: Option<Uuid>,
    /// Document the target chunk belongs to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_document_id: Option<Uuid>,
    pub connection_type: String,
    /// Detector-assigned strength, independent of recovery confidence
    pub strength: f32,
    #[serde(default)]
    pub user_validated: bool,
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
}

impl Connection {
    pub fn new(
        source_chunk_id: Uuid,
        target_chunk_id: Uuid,
        connection_type: impl Into<String>,
        strength: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_chunk_id,
            target_chunk_id,
            source_document_id: None,
            target_document_id: None,
            connection_type: connection_type.into(),
            strength,
            user_validated: false,
            metadata: Map::new(),
        }
    }

    /// Record which documents the two sides belong to.
    pub fn with_documents(mut self, source: Uuid, target: Uuid) -> Self {
        self.source_document_id = Some(source);
        self.target_document_id = Some(target);
        self
    }

    pub fn validated(mut self) -> Self {
        self.user_validated = true;
        self
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Why an item ended up in the `lost` bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryFailure {
    /// No tier or candidate cleared its threshold
    NotFound,
    /// A match exists but its confidence is below the review band
    BelowThreshold { confidence: f32 },
    /// Required input was missing or inconsistent
    MalformedInput { reason: String },
    /// Scoring failed for this item
    Computation { reason: String },
}

impl RecoveryFailure {
    /// Map a per-item error onto a failure record.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::MalformedInput(reason) => Self::MalformedInput {
                reason: reason.clone(),
            },
            Error::Computation(reason) => Self::Computation {
                reason: reason.clone(),
            },
            other => Self::Computation {
                reason: other.to_string(),
            },
        }
    }
}

/// Outcome of recovering one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveredAnnotation {
    pub reference: StoredReference,
    #[serde(rename = "match")]
    pub result: Option<MatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RecoveryFailure>,
}

impl RecoveredAnnotation {
    /// Confidence of the match, or 0 when nothing matched.
    pub fn confidence(&self) -> f32 {
        self.result.as_ref().map(|m| m.confidence).unwrap_or(0.0)
    }

    pub fn method(&self) -> Option<MatchMethod> {
        self.result.as_ref().map(|m| m.method)
    }
}

/// What happened to one side of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SideRemap {
    /// The side's chunk was not part of the reprocessed document
    Unchanged,
    /// The side was matched to a new chunk
    Remapped(EmbeddingMatch),
    /// The closest new chunk scored under the embedding floor
    BelowFloor(EmbeddingMatch),
    /// No usable new chunk to compare against
    NoCandidate,
}

impl SideRemap {
    /// Similarity contributed to the combined confidence.
    pub fn similarity(&self) -> Option<f32> {
        match self {
            Self::Unchanged => Some(1.0),
            Self::Remapped(m) | Self::BelowFloor(m) => Some(m.similarity),
            Self::NoCandidate => None,
        }
    }

    pub fn is_remapped(&self) -> bool {
        matches!(self, Self::Remapped(_))
    }

    pub fn is_below_floor(&self) -> bool {
        matches!(self, Self::BelowFloor(_))
    }
}

/// Outcome of remapping one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemappedConnection {
    pub connection: Connection,
    pub source: SideRemap,
    pub target: SideRemap,
    /// `min(source, target)` when both sides produced a similarity
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RecoveryFailure>,
}

/// Three disjoint buckets partitioning every item handed to an orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOutcomeSet<T> {
    pub success: Vec<T>,
    pub needs_review: Vec<T>,
    pub lost: Vec<T>,
}

impl<T> Default for RecoveryOutcomeSet<T> {
    fn default() -> Self {
        Self {
            success: Vec::new(),
            needs_review: Vec::new(),
            lost: Vec::new(),
        }
    }
}

impl<T> RecoveryOutcomeSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an item in the bucket for its classification.
    pub fn push(&mut self, classification: Classification, item: T) {
        match classification {
            Classification::Success => self.success.push(item),
            Classification::NeedsReview => self.needs_review.push(item),
            Classification::Lost => self.lost.push(item),
        }
    }

    pub fn bucket(&self, classification: Classification) -> &[T] {
        match classification {
            Classification::Success => &self.success,
            Classification::NeedsReview => &self.needs_review,
            Classification::Lost => &self.lost,
        }
    }

    /// Total items across all buckets.
    pub fn total(&self) -> usize {
        self.success.len() + self.needs_review.len() + self.lost.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            success: self.success.len(),
            needs_review: self.needs_review.len(),
            lost: self.lost.len(),
        }
    }
}

/// Bucket counts of a [`RecoveryOutcomeSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub success: usize,
    pub needs_review: usize,
    pub lost: usize,
}

impl OutcomeSummary {
    pub fn total(&self) -> usize {
        self.success + self.needs_review + self.lost
    }
}
