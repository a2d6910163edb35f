//! # codegraph-index
//!
//! Per-file indexing orchestrator: resolves a file's language, chunks it
//! via `codegraph-parser`, optionally enriches chunk metadata with
//! `codegraph-lsp` type information, optionally embeds each chunk via
//! `codegraph-embeddings`, and persists the result to `codegraph-db` and
//! `codegraph-vector`. Call [`IndexingOrchestrator::index_repository`]
//! once per repository indexing run; graph construction runs as a final
//! step over the whole repository's stored chunks.

pub mod error;
pub mod options;
pub mod orchestrator;

pub use error::IndexError;
pub use options::{FileError, IndexOptions, IndexingSummary, InputFile};
pub use orchestrator::IndexingOrchestrator;
