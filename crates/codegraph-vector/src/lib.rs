//! # codegraph-vector
//!
//! `DuckDB`-backed vector store: `FLOAT[768]`
//! columns for the text/code chunk embeddings and the memory embedding,
//! each indexed with the `vss` extension's HNSW index under cosine
//! distance. Vectors never touch the relational store (`codegraph-db`)
//! directly — it only tracks `has_text_embedding`/`has_code_embedding`
//! flags.

pub mod error;
pub mod search;
pub mod store;
mod util;
pub mod write;

pub use error::VectorError;
pub use search::VectorHit;
pub use store::{VectorStore, DIMENSION};
