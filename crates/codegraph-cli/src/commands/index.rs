//! `codegraph index`: walk a directory, chunk/embed/persist every
//! recognized source file, then rebuild the repository's graph.
//!
//! Grounded on `zen-cli::commands::index::handle`'s walk-then-pipeline
//! shape, generalized from one ecosystem's package layout to a raw
//! directory walk (the `ignore` crate, same as `zen-search::walk`).

use std::path::Path;
use std::sync::Arc;

use codegraph_config::CodegraphConfig;
use codegraph_index::{IndexOptions, IndexingOrchestrator, InputFile};
use codegraph_lsp::{LanguageServerKind, LspLifecycleManager, TypeExtractor};
use codegraph_parser::ChunkLanguage;
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::warn;

use crate::cli::{IndexArgs, OutputFormat};
use crate::commands::resources::{self, StoreOptions};
use crate::output;

#[derive(Debug, Serialize)]
struct IndexReport {
    repository: String,
    files_discovered: usize,
    indexed_files: u32,
    failed_files: u32,
    indexed_chunks: u32,
    indexed_nodes: u64,
    indexed_edges: u64,
    success_rate: f64,
    errors: Vec<codegraph_index::FileError>,
}

pub async fn run(args: IndexArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = CodegraphConfig::load()?;
    let repository = args.repository.clone().unwrap_or_else(|| {
        args.path.file_name().map_or_else(|| "repository".to_string(), |name| name.to_string_lossy().to_string())
    });

    let files = discover_files(&args.path);
    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}").unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress.set_message("indexing");

    let extract_metadata = !args.no_metadata && config.lsp.enabled;
    let store_options = StoreOptions {
        vector: !args.no_embeddings,
        cache: true,
        embeddings: !args.no_embeddings,
    };
    let stores = resources::open(&config, &store_options).await?;

    let (python_files, ts_files): (Vec<InputFile>, Vec<InputFile>) =
        files.into_iter().fold((Vec::new(), Vec::new()), |(mut py, mut ts), file| {
            match file.language.as_deref().and_then(ChunkLanguage::from_tag) {
                Some(ChunkLanguage::Python) => py.push(file),
                Some(lang) if lang.is_ts_family() => ts.push(file),
                _ => py.push(file),
            }
            (py, ts)
        });

    let options = IndexOptions {
        repository: repository.clone(),
        commit_id: args.commit.clone(),
        extract_metadata,
        generate_embeddings: !args.no_embeddings,
        build_graph: !args.no_graph,
        ..IndexOptions::new(&repository)
    };

    let mut summary = codegraph_index::IndexingSummary::default();
    let files_discovered = python_files.len() + ts_files.len();

    let python_lsp = if extract_metadata && !python_files.is_empty() {
        start_lifecycle(LanguageServerKind::Pyright, &args.path).await
    } else {
        None
    };
    let ts_lsp = if extract_metadata && !ts_files.is_empty() {
        start_lifecycle(LanguageServerKind::TypeScript, &args.path).await
    } else {
        None
    };

    for (group, lsp, typescript) in [(python_files, python_lsp.as_ref(), false), (ts_files, ts_lsp.as_ref(), true)] {
        if group.is_empty() {
            continue;
        }

        let mut orchestrator = IndexingOrchestrator::new(&stores.db);
        if let Some(vector_store) = &stores.vector_store {
            orchestrator = orchestrator.with_vector_store(vector_store);
        }
        if let Some(embeddings) = &stores.embeddings {
            orchestrator = orchestrator.with_embeddings(embeddings);
        }
        if let Some(cache) = &stores.cache {
            orchestrator = orchestrator.with_cache(cache);
        }
        if let Some(client) = lsp {
            let mut extractor = TypeExtractor::new(client.clone());
            if typescript {
                extractor = extractor.for_typescript();
            }
            orchestrator = orchestrator.with_type_extractor(Arc::new(extractor));
        }

        // Graph construction runs once, after both groups are persisted.
        let group_options = IndexOptions { build_graph: false, ..options.clone() };
        let group_len = group.len() as u64;
        let group_summary = orchestrator.index_repository(group, &group_options).await;
        progress.inc(group_len);

        summary.indexed_files += group_summary.indexed_files;
        summary.failed_files += group_summary.failed_files;
        summary.indexed_chunks += group_summary.indexed_chunks;
        summary.errors.extend(group_summary.errors);
    }

    if options.build_graph {
        match codegraph_graph::build(&stores.db, &repository).await {
            Ok(stats) => {
                summary.indexed_nodes = stats.total_nodes;
                summary.indexed_edges = stats.total_edges;
            }
            Err(err) => warn!(repository, error = %err, "graph construction failed"),
        }
    }

    progress.finish_with_message("done");

    let report = IndexReport {
        repository,
        files_discovered,
        indexed_files: summary.indexed_files,
        failed_files: summary.failed_files,
        indexed_chunks: summary.indexed_chunks,
        indexed_nodes: summary.indexed_nodes,
        indexed_edges: summary.indexed_edges,
        success_rate: summary.success_rate(),
        errors: summary.errors,
    };
    output::emit(&report, format)
}

async fn start_lifecycle(kind: LanguageServerKind, workspace_root: &Path) -> Option<Arc<codegraph_lsp::LspClient>> {
    let manager = LspLifecycleManager::new(kind, workspace_root.to_string_lossy().to_string());
    if let Err(err) = manager.start().await {
        warn!(?kind, error = %err, "language server failed to start, continuing without type enrichment for this language");
        return None;
    }
    manager.client().await
}

/// Walks `root` with gitignore-aware filtering, reading every file whose
/// extension resolves to a known language tag.
fn discover_files(root: &Path) -> Vec<InputFile> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(root).hidden(false).build() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let Some(language) = codegraph_parser::infer_language_tag(&path.to_string_lossy()) else {
            continue;
        };
        if ChunkLanguage::from_tag(language).is_none() {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        let relative = path.strip_prefix(root).unwrap_or(path).to_string_lossy().to_string();
        let mut file = InputFile::new(relative, content);
        file.language = Some(language.to_string());
        files.push(file);
    }
    files
}
