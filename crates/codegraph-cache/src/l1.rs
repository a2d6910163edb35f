//! In-process content-addressed chunk cache (L1).
//!
//! Keyed by file path, validated by MD5 of the current source text —
//! zero-trust: a stale chunk list is never returned once the file changes.
//! Grounded on `CodeChunkCache`/`CascadeCache` from
//! `api/services/caches/cascade_cache.py`.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use codegraph_core::hash::content_hash;
use codegraph_core::Chunk;
use lru::LruCache;

const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

struct Entry {
    content_hash: String,
    chunks: Vec<Chunk>,
    byte_size: u64,
}

fn entry_size(chunks: &[Chunk]) -> u64 {
    chunks.iter().map(|c| c.source_text.len() as u64).sum()
}

/// Statistics exposed by the L1 cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct L1Stats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub total_bytes: u64,
}

struct State {
    entries: LruCache<String, Entry>,
    total_bytes: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// In-process LRU chunk cache, byte-budgeted rather than entry-count-budgeted.
pub struct L1ChunkCache {
    state: Mutex<State>,
    max_bytes: u64,
}

impl L1ChunkCache {
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self {
            state: Mutex::new(State {
                entries: LruCache::new(NonZeroUsize::new(usize::MAX).unwrap()),
                total_bytes: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_bytes,
        }
    }

    /// Returns the cached chunk list iff the stored hash matches
    /// `MD5(source)`; otherwise invalidates the stale entry and misses.
    #[must_use]
    pub fn get(&self, path: &str, source: &str) -> Option<Vec<Chunk>> {
        let current_hash = content_hash(source);
        let mut state = self.state.lock().expect("L1 cache lock poisoned");

        let matches = state
            .entries
            .peek(path)
            .is_some_and(|entry| entry.content_hash == current_hash);

        if matches {
            let entry = state.entries.get(path).expect("checked above");
            state.hits += 1;
            return Some(entry.chunks.clone());
        }

        if state.entries.contains(path) {
            if let Some(stale) = state.entries.pop(path) {
                state.total_bytes = state.total_bytes.saturating_sub(stale.byte_size);
            }
        }
        state.misses += 1;
        None
    }

    /// Writes an entry, evicting least-recently-used entries until the
    /// total byte footprint is under `max_bytes`.
    pub fn put(&self, path: &str, source: &str, chunks: Vec<Chunk>) {
        let byte_size = entry_size(&chunks);
        let mut state = self.state.lock().expect("L1 cache lock poisoned");

        if let Some(old) = state.entries.pop(path) {
            state.total_bytes = state.total_bytes.saturating_sub(old.byte_size);
        }

        state.entries.put(
            path.to_string(),
            Entry {
                content_hash: content_hash(source),
                chunks,
                byte_size,
            },
        );
        state.total_bytes += byte_size;

        while state.total_bytes > self.max_bytes {
            let Some((_, evicted)) = state.entries.pop_lru() else {
                break;
            };
            state.total_bytes = state.total_bytes.saturating_sub(evicted.byte_size);
            state.evictions += 1;
        }
    }

    pub fn invalidate(&self, path: &str) {
        let mut state = self.state.lock().expect("L1 cache lock poisoned");
        if let Some(entry) = state.entries.pop(path) {
            state.total_bytes = state.total_bytes.saturating_sub(entry.byte_size);
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().expect("L1 cache lock poisoned");
        state.entries.clear();
        state.total_bytes = 0;
    }

    #[must_use]
    pub fn stats(&self) -> L1Stats {
        let state = self.state.lock().expect("L1 cache lock poisoned");
        L1Stats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
        }
    }

    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let stats = self.stats();
        let total = stats.hits + stats.misses;
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = stats.hits as f64 / total as f64;
        rate
    }
}

impl Default for L1ChunkCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}
