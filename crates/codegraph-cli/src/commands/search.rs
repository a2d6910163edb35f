//! `codegraph search`: one-shot hybrid search against an already-indexed
//! repository.

use std::path::PathBuf;

use codegraph_config::CodegraphConfig;
use codegraph_core::enums::EmbeddingDomain;
use codegraph_search::{Reranker, SearchFilters, SearchOptions};

use crate::cli::{OutputFormat, SearchArgs};
use crate::commands::resources::{self, StoreOptions};
use crate::output;

pub async fn run(args: SearchArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = CodegraphConfig::load()?;
    let store_options = StoreOptions { vector: !args.no_vector, cache: true, embeddings: !args.no_vector };
    let stores = resources::open(&config, &store_options).await?;

    let Some(vector_store) = &stores.vector_store else {
        anyhow::bail!("vector search requires a vector store; pass --no-vector to search lexically only");
    };

    let query_embedding = if args.no_vector {
        None
    } else if let Some(embeddings) = &stores.embeddings {
        let result = tokio::task::block_in_place(|| embeddings.generate_embedding(&args.query, EmbeddingDomain::Code))?;
        result.code
    } else {
        None
    };

    let reranker = args.rerank.then(|| {
        if config.embeddings.mock_mode {
            Reranker::mock()
        } else {
            Reranker::new(PathBuf::from(&config.embeddings.cache_dir))
        }
    });

    let filters = SearchFilters { language: args.language.clone() };
    let options = SearchOptions {
        top_k: args.limit,
        enable_lexical: !args.no_lexical,
        enable_vector: !args.no_vector,
        rerank: args.rerank,
        ..SearchOptions::default()
    };

    let response = codegraph_search::search(
        &stores.db,
        vector_store,
        stores.l2.as_ref(),
        reranker.as_ref(),
        &args.repository,
        &args.query,
        None,
        query_embedding.as_deref(),
        &filters,
        &options,
    )
    .await?;

    output::emit(&response, format)
}
