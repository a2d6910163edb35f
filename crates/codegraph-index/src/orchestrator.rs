//! Per-file indexing pipeline: chunk, enrich, embed, persist. Grounded on
//! `zen-cli::pipeline::IndexingPipeline::index_directory`'s walk-parse-
//! embed-store shape, generalized from "one language, one lake" to the
//! multi-language, multi-store pipeline this crate describes.

use std::path::Path;
use std::sync::Arc;

use codegraph_cache::Cascade;
use codegraph_core::enums::EmbeddingDomain;
use codegraph_core::Chunk;
use codegraph_db::{ChunkRepo, CodegraphDb};
use codegraph_embeddings::EmbeddingService;
use codegraph_lsp::TypeExtractor;
use codegraph_parser::{chunk_code, infer_language_tag};
use codegraph_vector::VectorStore;
use tracing::{info, warn};

use crate::error::IndexError;
use crate::options::{FileError, IndexOptions, IndexingSummary, InputFile};

/// Number of leading lines of `source_text` used as the text-domain
/// embedding input when a chunk has no `doc_summary`.
const TEXT_FALLBACK_LINES: usize = 20;

/// Upload-contract limits, grounded on `ui_upload_handler.py`'s
/// `MAX_FILE_SIZE`/`is_likely_binary` constants.
const MAX_FILE_BYTES: usize = 500 * 1024;
const BINARY_SAMPLE_BYTES: usize = 8192;
const BINARY_NON_PRINTABLE_RATIO: f64 = 0.3;

/// Lock-file / package-artifact substrings rejected before indexing,
/// matched case-insensitively against the whole path — mirrors
/// `ui_upload_handler.py`'s `SKIP_PATTERNS`.
const LOCK_FILE_PATTERNS: &[&str] = &[
    ".lock",
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "composer.lock",
    "gemfile.lock",
    "cargo.lock",
    "poetry.lock",
    "pipfile.lock",
    "go.sum",
    "mix.lock",
    "pubspec.lock",
];

/// Rejects paths that are empty, absolute, contain a null byte, or
/// contain a `..` segment — the traversal checks from
/// `ui_upload_handler.py`'s `validate_safe_path`.
fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("missing path".to_string());
    }
    if path.contains('\0') {
        return Err(format!("path contains a null byte (traversal blocked): {path}"));
    }
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return Err(format!("absolute path blocked (path traversal blocked): {path}"));
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(format!("parent directory reference blocked (path traversal blocked): {path}"));
    }
    Ok(())
}

/// True if `path`'s lowercased form contains a known lock-file or
/// package-artifact pattern.
fn is_lock_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    LOCK_FILE_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Detects binary content by sampling the first [`BINARY_SAMPLE_BYTES`]
/// characters for a null byte or a non-printable-character ratio above
/// [`BINARY_NON_PRINTABLE_RATIO`], mirroring `is_likely_binary`.
fn is_likely_binary(content: &str) -> bool {
    if content.is_empty() {
        return false;
    }
    let sample: Vec<char> = content.chars().take(BINARY_SAMPLE_BYTES).collect();
    if sample.contains(&'\0') {
        return true;
    }
    let non_printable = sample
        .iter()
        .filter(|&&c| !matches!(c, '\t' | '\n' | '\r' | ' ') && (u32::from(c) < 32 || u32::from(c) > 126))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = non_printable as f64 / sample.len() as f64;
    ratio > BINARY_NON_PRINTABLE_RATIO
}

/// Runs the full per-file upload contract: path safety, lock-file
/// rejection, binary detection, and the 500 KB size cap, in the order
/// `ui_upload_handler.py` applies them.
fn validate_upload_file(file: &InputFile) -> Result<(), String> {
    if file.path.is_empty() || file.content.is_empty() {
        return Err("missing path or content".to_string());
    }
    validate_path(&file.path)?;
    if is_lock_file(&file.path) {
        return Err(format!("skipped: lock file or package artifact: {}", file.path));
    }
    if is_likely_binary(&file.content) {
        return Err(format!("binary file detected (not supported for code analysis): {}", file.path));
    }
    if file.content.len() > MAX_FILE_BYTES {
        return Err(format!("file too large (>{}KB): {}", MAX_FILE_BYTES / 1024, file.path));
    }
    Ok(())
}

/// Validates a repository name against `[A-Za-z0-9._-]+`.
fn validate_repository_name(name: &str) -> Result<(), String> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        Ok(())
    } else {
        Err(format!("repository name must match [A-Za-z0-9._-]+: {name}"))
    }
}

/// Ties the parser, optional LSP type extractor, optional embedding
/// service, relational store, optional vector store, and graph
/// constructor together into the per-file and per-repository indexing
/// pipeline.
///
/// Every dependency beyond the relational store is optional so callers
/// can run a cheap "chunk and persist metadata only" pass (tests, dry
/// runs) without paying for model loads or a vector store file.
pub struct IndexingOrchestrator<'a> {
    db: &'a CodegraphDb,
    vector_store: Option<&'a VectorStore>,
    embeddings: Option<&'a EmbeddingService>,
    cache: Option<&'a Cascade>,
    type_extractor: Option<Arc<TypeExtractor>>,
}

impl<'a> IndexingOrchestrator<'a> {
    #[must_use]
    pub fn new(db: &'a CodegraphDb) -> Self {
        Self { db, vector_store: None, embeddings: None, cache: None, type_extractor: None }
    }

    #[must_use]
    pub fn with_vector_store(mut self, vector_store: &'a VectorStore) -> Self {
        self.vector_store = Some(vector_store);
        self
    }

    #[must_use]
    pub fn with_embeddings(mut self, embeddings: &'a EmbeddingService) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: &'a Cascade) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_type_extractor(mut self, type_extractor: Arc<TypeExtractor>) -> Self {
        self.type_extractor = Some(type_extractor);
        self
    }

    /// Indexes every file in `files`, then (if `options.build_graph`)
    /// rebuilds the call/import/re-export graph for `options.repository`
    /// from everything now stored. Never aborts on a single file's
    /// failure — each is recorded in the returned summary's `errors`.
    ///
    /// Rejects the whole call up front if `options.repository` doesn't
    /// match `[A-Za-z0-9._-]+`; per-file contract violations (unsafe
    /// path, lock file, binary content, oversize) are instead recorded
    /// per file via [`Self::index_file`], leaving the run `partial`
    /// rather than aborting it.
    pub async fn index_repository(&self, files: Vec<InputFile>, options: &IndexOptions) -> IndexingSummary {
        let mut summary = IndexingSummary::default();

        if let Err(err) = validate_repository_name(&options.repository) {
            warn!(repository = %options.repository, error = %err, "rejected repository name");
            summary.errors.push(FileError { file: "<repository>".into(), error: err });
            return summary;
        }

        for file in files {
            match self.index_file(&file, options).await {
                Ok(chunk_count) => {
                    summary.indexed_files += 1;
                    summary.indexed_chunks += chunk_count;
                }
                Err(err) => {
                    warn!(file = %file.path, error = %err, "failed to index file");
                    summary.failed_files += 1;
                    summary.errors.push(FileError { file: file.path.clone(), error: err });
                }
            }
        }

        if options.build_graph {
            match codegraph_graph::build(self.db, &options.repository).await {
                Ok(stats) => {
                    summary.indexed_nodes = stats.total_nodes;
                    summary.indexed_edges = stats.total_edges;
                    info!(
                        repository = %options.repository,
                        nodes = stats.total_nodes,
                        edges = stats.total_edges,
                        "graph construction complete"
                    );
                }
                Err(err) => {
                    summary.errors.push(FileError { file: "<graph construction>".into(), error: err.to_string() });
                }
            }
        }

        summary
    }

    /// Indexes a single file, returning the number of chunks persisted.
    async fn index_file(&self, file: &InputFile, options: &IndexOptions) -> Result<u32, String> {
        validate_upload_file(file)?;

        let language = file
            .language
            .clone()
            .or_else(|| infer_language_tag(&file.path).map(str::to_string))
            .ok_or_else(|| format!("unrecognized file extension for {}", file.path))?;

        let mut chunks = self.chunk_file(file, &language, options).await?;
        if chunks.is_empty() {
            return Ok(0);
        }

        if options.extract_metadata {
            if let Some(extractor) = &self.type_extractor {
                for chunk in &mut chunks {
                    enrich_with_types(extractor, chunk).await;
                }
            }
        }

        if options.generate_embeddings {
            if let Some(embeddings) = self.embeddings {
                self.embed_chunks(embeddings, &mut chunks).await?;
            }
        }

        self.persist_chunks(&chunks).await.map_err(|err| err.to_string())?;

        Ok(u32::try_from(chunks.len()).unwrap_or(u32::MAX))
    }

    async fn chunk_file(&self, file: &InputFile, language: &str, options: &IndexOptions) -> Result<Vec<Chunk>, String> {
        if let Some(cache) = self.cache {
            if let Some(cached) = cache.get_chunks(&file.path, &file.content).await {
                return Ok(cached);
            }
        }

        let repository = options.repository.clone();
        let path = file.path.clone();
        let content = file.content.clone();
        let language = language.to_string();
        let max_chunk_size = options.max_chunk_size;
        let min_chunk_size = options.min_chunk_size;

        let chunks = tokio::task::spawn_blocking(move || chunk_code(&content, &repository, &language, &path, max_chunk_size, min_chunk_size))
            .await
            .map_err(|err| format!("chunking task panicked: {err}"))?
            .map_err(|err| err.to_string())?;

        if let Some(cache) = self.cache {
            cache.put_chunks(&file.path, &file.content, chunks.clone()).await;
        }

        Ok(chunks)
    }

    /// Generates dual embeddings for every chunk. The text-domain model
    /// runs over the chunk's `doc_summary` when present, else its first
    /// `TEXT_FALLBACK_LINES` lines; the code-domain model always runs over
    /// the full `source_text`. Runs via `block_in_place` rather than
    /// `spawn_blocking`, since the embedding service is only ever held by
    /// reference here and inference still has to complete before this
    /// call returns.
    async fn embed_chunks(&self, embeddings: &EmbeddingService, chunks: &mut [Chunk]) -> Result<(), String> {
        let text_inputs: Vec<String> = chunks.iter().map(text_embedding_input).collect();
        let code_inputs: Vec<&str> = chunks.iter().map(|c| c.source_text.as_str()).collect();
        let text_refs: Vec<&str> = text_inputs.iter().map(String::as_str).collect();

        let (text_results, code_results) = tokio::task::block_in_place(|| {
            let text_results = embeddings.generate_embeddings_batch(&text_refs, EmbeddingDomain::Text);
            let code_results = embeddings.generate_embeddings_batch(&code_inputs, EmbeddingDomain::Code);
            (text_results, code_results)
        });

        let text_results = text_results.map_err(|err| err.to_string())?;
        let code_results = code_results.map_err(|err| err.to_string())?;

        for ((chunk, text_result), code_result) in chunks.iter_mut().zip(text_results).zip(code_results) {
            chunk.text_embedding = text_result.text;
            chunk.code_embedding = code_result.code;
        }

        Ok(())
    }

    async fn persist_chunks(&self, chunks: &[Chunk]) -> Result<(), IndexError> {
        let chunk_repo = ChunkRepo::new(self.db);
        for chunk in chunks {
            chunk_repo.upsert(chunk).await?;
            if let Some(vector_store) = self.vector_store {
                vector_store.upsert_chunk_embeddings(
                    &chunk.id,
                    &chunk.repository,
                    chunk.text_embedding.as_deref(),
                    chunk.code_embedding.as_deref(),
                )?;
            }
        }
        Ok(())
    }
}

fn text_embedding_input(chunk: &Chunk) -> String {
    if let Some(summary) = &chunk.metadata.doc_summary {
        if !summary.trim().is_empty() {
            return summary.clone();
        }
    }
    chunk.source_text.lines().take(TEXT_FALLBACK_LINES).collect::<Vec<_>>().join("\n")
}

async fn enrich_with_types(extractor: &TypeExtractor, chunk: &mut Chunk) {
    if chunk.is_anonymous() {
        return;
    }
    let Some((line, character)) = locate_symbol(&chunk.source_text, chunk.start_line, &chunk.name) else {
        return;
    };

    let info = extractor.extract(&chunk.file_path, &chunk.source_text, line, character, &chunk.name, &chunk.language).await;
    if info.signature.is_some() {
        chunk.metadata.type_signature = info.signature;
    }
    if info.return_type.is_some() {
        chunk.metadata.return_type = info.return_type;
    }
    if !info.param_types.is_empty() {
        chunk.metadata.parameter_types = Some(info.param_types);
    }
}

/// Column fallback when the chunk's simple name can't be found on its
/// start line.
const DEFAULT_SYMBOL_COLUMN: u32 = 4;

/// Finds `name`'s column within the chunk's start line only, falling back
/// to [`DEFAULT_SYMBOL_COLUMN`] rather than skipping LSP enrichment when
/// the name isn't found there (e.g. a decorator or comment precedes it).
fn locate_symbol(source: &str, chunk_start_line: u32, name: &str) -> Option<(u32, u32)> {
    if name.is_empty() {
        return None;
    }
    let start_line = source.lines().next().unwrap_or("");
    let column = start_line.find(name).map_or(DEFAULT_SYMBOL_COLUMN, |col| u32::try_from(col).unwrap_or(DEFAULT_SYMBOL_COLUMN));
    Some((chunk_start_line, column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn index_repository_chunks_and_persists_a_simple_file() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let orchestrator = IndexingOrchestrator::new(&db);
        let options = IndexOptions { build_graph: true, extract_metadata: false, generate_embeddings: false, ..IndexOptions::new("repo") };

        let files = vec![InputFile::new("api/util.py", "def greet(name):\n    return f\"hi {name}\"\n")];

        let summary = orchestrator.index_repository(files, &options).await;

        assert_eq!(summary.indexed_files, 1);
        assert_eq!(summary.failed_files, 0);
        assert!(summary.indexed_chunks >= 1);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn unrecognized_extension_fails_the_file_with_a_descriptive_error() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let orchestrator = IndexingOrchestrator::new(&db);
        let options = IndexOptions { build_graph: false, ..IndexOptions::new("repo") };

        let files = vec![InputFile::new("README.something-weird", "hello")];
        let summary = orchestrator.index_repository(files, &options).await;

        assert_eq!(summary.indexed_files, 0);
        assert_eq!(summary.failed_files, 1);
        assert!(summary.errors[0].error.contains("unrecognized file extension"));
    }

    #[tokio::test]
    async fn a_lock_file_among_valid_files_yields_partial_status() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let orchestrator = IndexingOrchestrator::new(&db);
        let options = IndexOptions { build_graph: false, extract_metadata: false, generate_embeddings: false, ..IndexOptions::new("repo") };

        let files = vec![
            InputFile::new("api/a.py", "def a():\n    return 1\n"),
            InputFile::new("api/b.py", "def b():\n    return 2\n"),
            InputFile::new("api/c.py", "def c():\n    return 3\n"),
            InputFile::new("package-lock.json", "{\"name\": \"x\"}"),
        ];

        let summary = orchestrator.index_repository(files, &options).await;

        assert_eq!(summary.indexed_files, 3);
        assert_eq!(summary.failed_files, 1);
        assert!(summary.errors.iter().any(|e| e.error.contains("lock file")));
    }

    #[tokio::test]
    async fn a_traversal_path_is_skipped_with_a_traversal_error() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let orchestrator = IndexingOrchestrator::new(&db);
        let options = IndexOptions { build_graph: false, extract_metadata: false, generate_embeddings: false, ..IndexOptions::new("repo") };

        let files = vec![
            InputFile::new("../../etc/passwd", "root:x:0:0"),
            InputFile::new("/etc/passwd", "root:x:0:0"),
        ];

        let summary = orchestrator.index_repository(files, &options).await;

        assert_eq!(summary.indexed_files, 0);
        assert_eq!(summary.failed_files, 2);
        assert!(summary.errors.iter().all(|e| e.error.contains("traversal")));
    }

    #[tokio::test]
    async fn an_invalid_repository_name_rejects_the_whole_call_up_front() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let orchestrator = IndexingOrchestrator::new(&db);
        let options = IndexOptions::new("not a valid repo name!");

        let files = vec![InputFile::new("api/a.py", "def a():\n    return 1\n")];
        let summary = orchestrator.index_repository(files, &options).await;

        assert_eq!(summary.indexed_files, 0);
        assert_eq!(summary.failed_files, 0);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].error.contains("[A-Za-z0-9._-]+"));
    }

    #[test]
    fn is_likely_binary_detects_null_bytes_and_high_non_printable_ratio() {
        assert!(is_likely_binary("hello\0world"));
        assert!(is_likely_binary(&"\u{1}\u{2}\u{3}\u{4}".repeat(10)));
        assert!(!is_likely_binary("def greet():\n    return 'hi'\n"));
    }

    #[test]
    fn is_lock_file_matches_known_patterns_case_insensitively() {
        assert!(is_lock_file("Cargo.lock"));
        assert!(is_lock_file("frontend/package-lock.json"));
        assert!(!is_lock_file("src/lock_manager.py"));
    }

    #[test]
    fn validate_path_rejects_traversal_and_absolute_paths() {
        assert!(validate_path("../secrets.env").unwrap_err().contains("traversal"));
        assert!(validate_path("/etc/passwd").unwrap_err().contains("traversal"));
        assert!(validate_path("a/../b").unwrap_err().contains("traversal"));
        assert!(validate_path("api/util.py").is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn embedding_generation_populates_both_domains() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let embeddings = EmbeddingService::mock();
        let orchestrator = IndexingOrchestrator::new(&db).with_embeddings(&embeddings);
        let options = IndexOptions { extract_metadata: false, build_graph: false, ..IndexOptions::new("repo") };

        let files = vec![InputFile::new("api/util.py", "def greet(name):\n    return f\"hi {name}\"\n")];
        let summary = orchestrator.index_repository(files, &options).await;

        assert_eq!(summary.indexed_files, 1);
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn locate_symbol_finds_column_on_start_line() {
        let source = "    def save(self):\n        pass\n";
        let found = locate_symbol(source, 10, "save");
        assert_eq!(found, Some((10, 8)));
    }

    #[test]
    fn locate_symbol_falls_back_to_column_four_when_absent_on_start_line() {
        assert_eq!(locate_symbol("x = 1\n", 1, "save"), Some((1, DEFAULT_SYMBOL_COLUMN)));
    }

    #[test]
    fn locate_symbol_returns_none_for_empty_name() {
        assert_eq!(locate_symbol("x = 1\n", 1, ""), None);
    }
}
