//! Core traits for reanchor collaborators.
//!
//! The recovery engine itself is synchronous and pure; these traits describe
//! what it consumes from the outside (chunk and text storage) and the one
//! optional capability it accepts (a match cache).

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Chunk, MatchResult};

// =============================================================================
// STORAGE
// =============================================================================

/// Read access to a document's chunk generations.
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Chunks of the current generation (`is_current = true`), in index order.
    async fn current_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>>;

    /// Embeddings of superseded chunks (`is_current = false`), keyed by chunk id.
    async fn retained_embeddings(&self, document_id: Uuid) -> Result<HashMap<Uuid, Vec<f32>>>;
}

/// Read access to the current extracted text of a document.
#[async_trait]
pub trait DocumentTextSource: Send + Sync {
    /// Current document text. Errors with `DocumentNotFound` when absent.
    async fn current_text(&self, document_id: Uuid) -> Result<String>;
}

// =============================================================================
// CACHE
// =============================================================================

/// A cached tier outcome for one reference against one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMatch {
    /// `None` records that no tier matched
    pub result: Option<MatchResult>,
}

/// Injected cache capability for annotation recovery.
///
/// Keys are content fingerprints, so a hit returns exactly what
/// recomputation would. Implementations must tolerate concurrent use.
pub trait MatchCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedMatch>;

    fn set(&self, key: String, value: CachedMatch);

    /// Lifetime of an entry after `set`.
    fn ttl(&self) -> Duration;
}
