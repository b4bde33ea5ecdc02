//! In-memory chunk and document stores.
//!
//! Chunk storage is append-only. Reprocessing a document adds a new
//! generation and tombstones the previous one (`is_current = false`,
//! `superseded_at` set) instead of deleting it, so the embeddings of
//! superseded chunks stay available for connection remapping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reanchor_core::{Chunk, ChunkRepository, DocumentTextSource, Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A chunk plus its storage bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub chunk: Chunk,
    /// Reprocessing generation, starting at 1
    pub generation: u32,
    pub created_at: DateTime<Utc>,
    /// Set when a later generation replaced this chunk
    pub superseded_at: Option<DateTime<Utc>>,
}

/// Append-only chunk store keyed by document.
#[derive(Clone, Default)]
pub struct MemoryChunkStore {
    documents: Arc<RwLock<HashMap<Uuid, Vec<StoredChunk>>>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `chunks` as the current generation of `document_id`.
    ///
    /// Every chunk of the previous generation is tombstoned, never removed.
    /// Incoming chunks are forced current and attributed to `document_id`.
    /// Returns the new generation number.
    pub async fn replace_generation(&self, document_id: Uuid, chunks: Vec<Chunk>) -> u32 {
        let now = Utc::now();
        let mut documents = self.documents.write().await;
        let records = documents.entry(document_id).or_default();

        let mut superseded = 0usize;
        for record in records.iter_mut().filter(|r| r.chunk.is_current) {
            record.chunk.is_current = false;
            record.superseded_at = Some(now);
            superseded += 1;
        }

        let generation = records.iter().map(|r| r.generation).max().unwrap_or(0) + 1;
        let added = chunks.len();
        records.extend(chunks.into_iter().map(|mut chunk| {
            chunk.document_id = document_id;
            chunk.is_current = true;
            StoredChunk {
                chunk,
                generation,
                created_at: now,
                superseded_at: None,
            }
        }));

        debug!(
            subsystem = "store",
            document_id = %document_id,
            generation,
            chunk_count = added,
            superseded,
            "Installed chunk generation"
        );
        generation
    }

    /// Every stored chunk of a document, tombstoned ones included.
    pub async fn history(&self, document_id: Uuid) -> Vec<StoredChunk> {
        self.documents
            .read()
            .await
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Current generation number of a document, if it has any chunks.
    pub async fn generation(&self, document_id: Uuid) -> Option<u32> {
        self.documents
            .read()
            .await
            .get(&document_id)
            .and_then(|records| records.iter().map(|r| r.generation).max())
    }
}

#[async_trait]
impl ChunkRepository for MemoryChunkStore {
    async fn current_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let documents = self.documents.read().await;
        let records = documents
            .get(&document_id)
            .ok_or(Error::DocumentNotFound(document_id))?;

        let mut chunks: Vec<Chunk> = records
            .iter()
            .filter(|r| r.chunk.is_current)
            .map(|r| r.chunk.clone())
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn retained_embeddings(&self, document_id: Uuid) -> Result<HashMap<Uuid, Vec<f32>>> {
        let documents = self.documents.read().await;
        let records = documents
            .get(&document_id)
            .ok_or(Error::DocumentNotFound(document_id))?;

        Ok(records
            .iter()
            .filter(|r| !r.chunk.is_current)
            .filter_map(|r| r.chunk.embedding.clone().map(|e| (r.chunk.id, e)))
            .collect())
    }
}

/// Current text per document.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    texts: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the current text of a document.
    pub async fn put_text(&self, document_id: Uuid, text: impl Into<String>) {
        self.texts.write().await.insert(document_id, text.into());
    }

    pub async fn remove(&self, document_id: Uuid) -> Option<String> {
        self.texts.write().await.remove(&document_id)
    }
}

#[async_trait]
impl DocumentTextSource for MemoryDocumentStore {
    async fn current_text(&self, document_id: Uuid) -> Result<String> {
        self.texts
            .read()
            .await
            .get(&document_id)
            .cloned()
            .ok_or(Error::DocumentNotFound(document_id))
    }
}
