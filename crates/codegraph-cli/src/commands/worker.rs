//! `codegraph worker`: the subprocess a [`codegraph_stream::BatchConsumer`]
//! spawns per batch. Reads its assigned files from disk, indexes them
//! against an already-running relational store, and prints the
//! `{success_count, error_count}` contract the consumer expects on
//! stdout. Never touches the graph — that's rebuilt once, by the
//! consumer, after the whole repository's stream is drained.

use std::path::Path;

use codegraph_config::CodegraphConfig;
use codegraph_index::{IndexOptions, IndexingOrchestrator, InputFile};
use serde::Serialize;
use tracing::warn;

use crate::cli::WorkerArgs;
use crate::commands::resources::{self, StoreOptions};

#[derive(Debug, Serialize)]
struct WorkerResult {
    success_count: u32,
    error_count: u32,
}

/// # Errors
/// Returns an error if the relational store, vector store, or embedding
/// service cannot be opened; a per-file read or index failure is
/// recorded in the batch's `error_count` instead of aborting the batch.
pub async fn run(args: WorkerArgs) -> anyhow::Result<()> {
    let config = CodegraphConfig::load_with_env_overrides(&[("CODEGRAPH_DATABASE__URL".to_string(), args.db_url.clone())])?;

    let store_options = StoreOptions { vector: true, cache: true, embeddings: true };
    let stores = resources::open(&config, &store_options).await?;

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

    let mut files = Vec::with_capacity(args.files.len());
    let mut error_count = 0u32;
    for path in &args.files {
        match std::fs::read_to_string(Path::new(path)) {
            Ok(content) => files.push(InputFile::new(path.clone(), content)),
            Err(err) => {
                warn!(file = %path, error = %err, "worker could not read file, counting as a batch error");
                error_count += 1;
            }
        }
    }

    let options = IndexOptions { build_graph: false, ..IndexOptions::new(&args.repository) };
    let summary = orchestrator.index_repository(files, &options).await;

    let result = WorkerResult { success_count: summary.indexed_files, error_count: error_count + summary.failed_files };
    println!("{}", serde_json::to_string(&result)?);

    if result.error_count > 0 && result.success_count == 0 {
        anyhow::bail!("worker batch failed entirely: {} file(s) errored", result.error_count);
    }
    Ok(())
}
