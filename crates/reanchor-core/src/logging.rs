//! Structured logging schema and field name constants for reanchor.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query recovery runs consistently.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Batch could not run at all (snapshot fetch failed) |
//! | WARN  | Item isolated and classified lost because of bad input or math |
//! | INFO  | Batch completions with bucket counts |
//! | DEBUG | Tier decisions, config choices, cache hits |
//! | TRACE | Per-window and per-candidate scores |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "recovery", "match", "store", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "annotation_orchestrator", "connection_orchestrator", "embedding_matcher"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "recover_annotations", "remap_connections"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document UUID being recovered against.
pub const DOCUMENT_ID: &str = "document_id";

/// Stored reference (annotation) UUID.
pub const REFERENCE_ID: &str = "reference_id";

/// Connection UUID.
pub const CONNECTION_ID: &str = "connection_id";

/// Chunk UUID.
pub const CHUNK_ID: &str = "chunk_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of items handed to an orchestrator.
pub const INPUT_COUNT: &str = "input_count";

/// Number of chunks in the snapshot.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Items accepted automatically.
pub const SUCCESS_COUNT: &str = "success_count";

/// Items flagged for review.
pub const REVIEW_COUNT: &str = "review_count";

/// Items classified lost.
pub const LOST_COUNT: &str = "lost_count";

// ─── Match fields ──────────────────────────────────────────────────────────

/// Tier that produced the match ("exact", "context", "chunk_bounded", "trigram").
pub const METHOD: &str = "method";

/// Confidence of the chosen match.
pub const CONFIDENCE: &str = "confidence";

/// Raw similarity before penalties.
pub const SIMILARITY: &str = "similarity";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Outcome bucket ("success", "needs_review", "lost").
pub const CLASSIFICATION: &str = "classification";

/// Error message when an item fails.
pub const ERROR_MSG: &str = "error";

/// Whether a cached result was used.
pub const CACHE_HIT: &str = "cache_hit";
