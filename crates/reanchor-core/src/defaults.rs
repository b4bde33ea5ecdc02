//! Centralized default constants for reanchor.
//!
//! **This module is the single source of truth** for every acceptance
//! threshold used by the recovery engine. Matchers and orchestrators read
//! these through [`RecoveryConfig`](crate::config::RecoveryConfig); nothing
//! else in the workspace may restate a threshold as a literal.
//!
//! The values are empirical. Each group notes what it bounds.

// =============================================================================
// ANNOTATION TIERS
// =============================================================================

/// Minimum trigram similarity for the context-guided and chunk-bounded tiers.
pub const TIER_ACCEPTANCE: f32 = 0.75;

/// Confidence multiplier applied to the full-document trigram fallback.
///
/// The fallback must never out-rank a context or chunk-bounded hit with the
/// same raw score; its effective floor is `TIER_ACCEPTANCE * TRIGRAM_PENALTY`.
pub const TRIGRAM_PENALTY: f32 = 0.9;

/// Annotation confidence at or above which a recovered position is accepted.
pub const ANNOTATION_SUCCESS: f32 = 0.85;

/// Annotation confidence at or above which a position is kept for review.
pub const ANNOTATION_REVIEW: f32 = 0.70;

// =============================================================================
// CONNECTION REMAPPING
// =============================================================================

/// Minimum cosine similarity for an embedding candidate to count as a match.
pub const EMBEDDING_FLOOR: f32 = 0.75;

/// Combined connection similarity at or above which ids are updated silently.
pub const CONNECTION_SUCCESS: f32 = 0.95;

/// Combined connection similarity at or above which ids are updated and flagged.
pub const CONNECTION_REVIEW: f32 = 0.85;

// =============================================================================
// WINDOW SCANNING
// =============================================================================

/// Fractional window length tolerance used when refining a fuzzy match.
pub const SCAN_LENGTH_TOLERANCE: f32 = 0.1;

/// Upper bound on the window length delta explored during refinement.
pub const SCAN_MAX_LENGTH_DELTA: usize = 32;

/// Upper bound on the coarse scan step in characters.
pub const SCAN_MAX_STEP: usize = 10;

/// Needle length divisor giving the coarse scan step.
pub const SCAN_STEP_DIVISOR: usize = 20;

// =============================================================================
// CONTEXT CAPTURE
// =============================================================================

/// Characters captured on each side of a span as its text context.
pub const CONTEXT_WINDOW: usize = 100;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Width of the 768-d embedding models chunks are usually indexed with.
pub const EMBED_DIMENSION: usize = 768;

// =============================================================================
// CACHE
// =============================================================================

/// Default number of entries held by the LRU match cache.
pub const CACHE_CAPACITY: usize = 1000;

/// Default match cache entry lifetime in seconds.
pub const CACHE_TTL_SECS: u64 = 300;
