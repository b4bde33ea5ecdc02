//! # reanchor-recovery
//!
//! Orchestration layer of the reanchor reference drift recovery engine.
//!
//! This crate provides:
//! - Annotation recovery through the four-tier matcher chain
//! - Connection remapping through embedding similarity
//! - Injected match caches (no-op and LRU with expiry)
//! - Append-only in-memory chunk and document stores
//! - A service that fetches one consistent snapshot per batch
//!
//! ## Example
//!
//! ```ignore
//! use reanchor_recovery::{MemoryChunkStore, MemoryDocumentStore, RecoveryService};
//! use reanchor_core::RecoveryConfig;
//!
//! let service = RecoveryService::new(chunks, documents, RecoveryConfig::load()?);
//! let outcomes = service
//!     .recover_document_annotations(document_id, &references)
//!     .await?;
//! println!("{} need review", outcomes.needs_review.len());
//! ```

pub mod annotation;
pub mod cache;
pub mod connection;
pub mod service;
pub mod store;

// Re-export core types
pub use reanchor_core::*;

pub use annotation::AnnotationRecoveryOrchestrator;
pub use cache::{cache_key, snapshot_fingerprint, LruTtlCache, NoOpCache};
pub use connection::ConnectionRemapOrchestrator;
pub use service::{RecoveryService, RemapReport};
pub use store::{MemoryChunkStore, MemoryDocumentStore, StoredChunk};
