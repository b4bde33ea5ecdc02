//! # reanchor-match
//!
//! Matchers for the reanchor recovery engine.
//!
//! This crate provides:
//! - Text normalization and trigram similarity
//! - Sliding window scanning over character buffers
//! - The four annotation tiers (exact, context, chunk-bounded, trigram)
//! - Cosine similarity and the embedding matcher used for connections
//!
//! All offsets are character offsets into the current document text.
//!
//! ## Example
//!
//! ```ignore
//! use reanchor_match::{default_tiers, DocumentSnapshot};
//! use reanchor_core::RecoveryConfig;
//!
//! let tiers = default_tiers(&RecoveryConfig::default());
//! let snapshot = DocumentSnapshot::new(&text, &chunks);
//! let hit = tiers.iter().find_map(|tier| tier.find(&reference, &snapshot));
//! ```

pub mod document;
pub mod embedding;
pub mod normalize;
pub mod scan;
pub mod tiers;
pub mod trigram;
pub mod vector;

pub use document::DocumentSnapshot;
pub use embedding::EmbeddingSimilarityMatcher;
pub use normalize::TextNormalizer;
pub use scan::{Needle, Window, WindowScanner};
pub use tiers::{
    default_tiers, ChunkBoundedMatcher, ContextGuidedMatcher, ExactMatcher, MatchSettings,
    TierMatcher, TrigramFallbackMatcher,
};
pub use trigram::{
    text_similarity, trigram_similarity, Trigram, TrigramCounts, TrigramIndexer, TrigramSet,
};
pub use vector::{cosine_similarity, validate_vector};
