//! Inputs and outputs for [`crate::orchestrator::IndexingOrchestrator`].

use serde::{Deserialize, Serialize};

/// One file handed to the orchestrator. `language` overrides the
/// extension-based inference when the caller already knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub path: String,
    pub content: String,
    pub language: Option<String>,
}

impl InputFile {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self { path: path.into(), content: content.into(), language: None }
    }
}

/// Tunables for a single [`crate::orchestrator::IndexingOrchestrator::index_repository`]
/// call.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOptions {
    pub repository: String,
    pub commit_id: Option<String>,
    /// Whether to run the LSP type extractor over non-anonymous chunks.
    pub extract_metadata: bool,
    /// Whether to generate dual embeddings for each chunk.
    pub generate_embeddings: bool,
    /// Whether to rebuild the call/import/re-export graph once every file
    /// has been persisted.
    pub build_graph: bool,
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
}

impl IndexOptions {
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self { repository: repository.into(), ..Self::default() }
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            repository: String::new(),
            commit_id: None,
            extract_metadata: true,
            generate_embeddings: true,
            build_graph: true,
            max_chunk_size: 2000,
            min_chunk_size: 100,
        }
    }
}

/// One file's indexing failure, collected rather than aborting the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileError {
    pub file: String,
    pub error: String,
}

/// Aggregate result of an [`crate::orchestrator::IndexingOrchestrator::index_repository`]
/// call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexingSummary {
    pub indexed_files: u32,
    pub failed_files: u32,
    pub indexed_chunks: u32,
    pub indexed_nodes: u64,
    pub indexed_edges: u64,
    pub errors: Vec<FileError>,
}

impl IndexingSummary {
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.indexed_files + self.failed_files;
        if total == 0 {
            return 1.0;
        }
        f64::from(self.indexed_files) / f64::from(total)
    }
}
