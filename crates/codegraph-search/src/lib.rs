//! # codegraph-search
//!
//! Hybrid search: lexical (FTS5-trigram) and vector (HNSW cosine) fan-out
//! fused by weighted Reciprocal Rank Fusion, with an auto-weight heuristic
//! and an optional cross-encoder rerank pass over the fused head.

pub mod error;
pub mod fusion;
pub mod pipeline;
pub mod rerank;
pub mod weights;

pub use error::SearchError;
pub use pipeline::{search, ScoredResult, SearchFilters, SearchMetadata, SearchOptions, SearchResponse};
pub use rerank::Reranker;
pub use weights::auto_weights;
