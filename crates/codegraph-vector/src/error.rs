//! Vector-store error type.

/// Errors raised by the `DuckDB`-backed vector store.
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("vector store lock poisoned")]
    LockPoisoned,

    #[error("embedding has wrong dimension: expected {expected}, got {got}")]
    WrongDimension { expected: usize, got: usize },

    #[error("embedding domain {0:?} has no dedicated column in the vector store")]
    UnsupportedDomain(codegraph_core::enums::EmbeddingDomain),
}
