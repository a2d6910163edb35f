//! Shared storage/cache/embedding-service setup for the subcommands that
//! exercise the indexing and search pipelines.

use std::path::PathBuf;

use codegraph_cache::{Cascade, L1ChunkCache, L2Cache};
use codegraph_config::CodegraphConfig;
use codegraph_db::CodegraphDb;
use codegraph_embeddings::{EmbeddingService, EmbeddingServiceConfig};
use codegraph_vector::VectorStore;
use tracing::warn;

/// Storage and model handles a command asks for, opened up front so a
/// failure surfaces before any file is processed.
pub struct Stores {
    pub db: CodegraphDb,
    pub vector_store: Option<VectorStore>,
    pub cache: Option<Cascade>,
    pub l2: Option<L2Cache>,
    pub embeddings: Option<EmbeddingService>,
}

pub struct StoreOptions {
    pub vector: bool,
    pub cache: bool,
    pub embeddings: bool,
}

/// Opens the relational store unconditionally, plus whichever of the
/// vector store / cascade cache / embedding service `options` asks for.
/// A cache or embedding-service open failure is logged and downgrades to
/// `None` rather than aborting — both are optional accelerators the
/// pipeline already tolerates missing.
///
/// # Errors
/// Returns an error if the relational store or the (required) vector
/// store cannot be opened.
pub async fn open(config: &CodegraphConfig, options: &StoreOptions) -> anyhow::Result<Stores> {
    let db = CodegraphDb::open(&config.database.url).await?;

    let vector_store = if options.vector { Some(VectorStore::open(&config.vector_store.path)?) } else { None };

    let (cache, l2) = if options.cache {
        match (L2Cache::new(&config.cache.url, config.cache.l2_ttl_secs), L2Cache::new(&config.cache.url, config.cache.l2_ttl_secs)) {
            (Ok(l2_for_chunks), Ok(l2_for_search)) => {
                (Some(Cascade::new(L1ChunkCache::new(config.cache.l1_max_bytes), l2_for_chunks)), Some(l2_for_search))
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "failed to connect to shared cache, continuing without it");
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    let embeddings = if options.embeddings {
        let embedding_config = EmbeddingServiceConfig::from_names(
            &config.embeddings.text_model,
            &config.embeddings.code_model,
            config.embeddings.mock_mode,
            PathBuf::from(&config.embeddings.cache_dir),
        )?;
        Some(EmbeddingService::new(embedding_config))
    } else {
        None
    };

    Ok(Stores { db, vector_store, cache, l2, embeddings })
}
