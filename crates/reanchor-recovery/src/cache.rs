//! Match caches for annotation recovery.
//!
//! A cache is an injected capability: the orchestrator works the same with
//! [`NoOpCache`], with [`LruTtlCache`], or with no cache at all. Keys are
//! SHA-256 fingerprints over everything a tier result depends on, so a hit
//! always equals what recomputation would return.
//!
//! ## Key layout
//!
//! - [`snapshot_fingerprint`]: document text, chunk layout and config
//! - [`cache_key`]: snapshot fingerprint plus the reference's captured fields

use lru::LruCache;
use reanchor_core::{defaults, CachedMatch, Chunk, MatchCache, RecoveryConfig, StoredReference};
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

const KEY_PREFIX: &str = "ra:match:";

/// Fingerprint of one document snapshot under one configuration.
pub fn snapshot_fingerprint(text: &str, chunks: &[Chunk], config: &RecoveryConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);

    for chunk in chunks {
        hasher.update(chunk.id.as_bytes());
        hasher.update(chunk.document_id.as_bytes());
        hasher.update(chunk.chunk_index.to_le_bytes());
        hasher.update((chunk.start_offset as u64).to_le_bytes());
        hasher.update((chunk.end_offset as u64).to_le_bytes());
        hasher.update([chunk.is_current as u8]);
    }

    // Thresholds and scan settings change tier outcomes
    match serde_json::to_vec(config) {
        Ok(bytes) => hasher.update(&bytes),
        Err(_) => hasher.update(format!("{:?}", config).as_bytes()),
    }

    hex::encode(hasher.finalize())
}

/// Cache key for `reference` against a snapshot fingerprint.
pub fn cache_key(snapshot: &str, reference: &StoredReference) -> String {
    let mut hasher = Sha256::new();
    hasher.update(snapshot.as_bytes());
    hasher.update(reference.id.as_bytes());

    for field in [
        &reference.original_text,
        &reference.text_context.before,
        &reference.text_context.after,
    ] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.update((reference.original_start_offset as u64).to_le_bytes());
    hasher.update((reference.original_end_offset as u64).to_le_bytes());
    match reference.original_chunk_index {
        Some(index) => {
            hasher.update([1u8]);
            hasher.update(index.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }

    let hash = hex::encode(hasher.finalize());
    format!("{}{}", KEY_PREFIX, &hash[..32])
}

// =============================================================================
// NO-OP
// =============================================================================

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl MatchCache for NoOpCache {
    fn get(&self, _key: &str) -> Option<CachedMatch> {
        None
    }

    fn set(&self, _key: String, _value: CachedMatch) {}

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }
}

// =============================================================================
// LRU + TTL
// =============================================================================

struct Entry {
    value: CachedMatch,
    expires_at: Instant,
}

/// Bounded in-process cache with per-entry expiry.
pub struct LruTtlCache {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl LruTtlCache {
    /// Create a cache holding at most `capacity` entries, each living `ttl`.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LruTtlCache {
    fn default() -> Self {
        Self::new(
            defaults::CACHE_CAPACITY,
            Duration::from_secs(defaults::CACHE_TTL_SECS),
        )
    }
}

impl MatchCache for LruTtlCache {
    fn get(&self, key: &str) -> Option<CachedMatch> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            debug!(key, "Evicted expired cache entry");
        }
        None
    }

    fn set(&self, key: String, value: CachedMatch) {
        let expires_at = Instant::now() + self.ttl;
        self.lock().put(key, Entry { value, expires_at });
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
