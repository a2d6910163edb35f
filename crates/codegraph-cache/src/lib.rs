//! # codegraph-cache
//!
//! Three-tier cache coordinating an in-process LRU (L1), a shared redis
//! store (L2), and the relational database as the ultimate source of
//! truth (L3, owned by `codegraph-db`).
//!
//! `L1ChunkCache` and `L2Cache` can be used independently; `Cascade` wires
//! them together with the promotion/invalidation policy from
//! `api/services/caches/cascade_cache.py`.

pub mod cascade;
pub mod error;
pub mod keys;
pub mod l1;
pub mod l2;

pub use cascade::Cascade;
pub use error::CacheError;
pub use l1::{L1ChunkCache, L1Stats};
pub use l2::L2Cache;
