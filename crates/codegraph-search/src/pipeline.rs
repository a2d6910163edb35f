//! The hybrid search pipeline, orchestrating lexical and
//! vector fan-out, RRF fusion, optional rerank, and L2 caching.

use std::time::Instant;

use codegraph_cache::{keys, L2Cache};
use codegraph_core::enums::EmbeddingDomain;
use codegraph_db::{ChunkRepo, CodegraphDb};
use codegraph_vector::VectorStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SearchError;
use crate::fusion::{fuse, FusedCandidate, ScoreContribution};
use crate::rerank::Reranker;

const SEARCH_CACHE_TTL_SECS: u64 = 30;
const LOW_QUALITY_VECTOR_THRESHOLD: f64 = 0.1;

/// Optional metadata filters applied to fused candidates before the
/// final page is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchFilters {
    pub language: Option<String>,
}

/// Tunables for [`search`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOptions {
    pub top_k: u32,
    pub offset: u32,
    pub enable_lexical: bool,
    pub enable_vector: bool,
    pub lexical_weight: f64,
    pub vector_weight: f64,
    pub candidate_pool_size: u32,
    pub ef_search: u32,
    /// Overrides `lexical_weight`/`vector_weight` with the auto-weight
    /// heuristic.
    pub auto_weight: bool,
    pub rerank: bool,
    pub rerank_pool_size: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            offset: 0,
            enable_lexical: true,
            enable_vector: true,
            lexical_weight: 0.4,
            vector_weight: 0.6,
            candidate_pool_size: 100,
            ef_search: 100,
            auto_weight: false,
            rerank: false,
            rerank_pool_size: 30,
        }
    }
}

/// A single query result: chunk display fields plus the fusion score
/// breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    pub chunk_id: String,
    pub repository: String,
    pub file_path: String,
    pub name: String,
    pub qualified_name: Option<String>,
    pub rank: u32,
    pub rrf_score: f64,
    pub lexical_rank: Option<u32>,
    pub vector_rank: Option<u32>,
    pub rerank_score: Option<f32>,
    pub contributions: Vec<ScoreContribution>,
}

/// Per-stage timing/sizing metadata returned alongside the results
/// returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchMetadata {
    pub total_time_ms: f64,
    pub lexical_time_ms: f64,
    pub vector_time_ms: f64,
    pub fusion_time_ms: f64,
    pub rerank_time_ms: Option<f64>,
    pub lexical_pool_size: usize,
    pub vector_pool_size: usize,
    pub effective_lexical_weight: f64,
    pub effective_vector_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<ScoredResult>,
    pub metadata: SearchMetadata,
}

/// Runs the full hybrid search pipeline.
///
/// # Errors
/// Returns [`SearchError::BothMethodsDisabled`]/[`SearchError::EmptyQuery`]
/// on invalid input, or a database/vector-store/rerank error otherwise.
#[allow(clippy::too_many_arguments)]
pub async fn search(
    db: &CodegraphDb,
    vector_store: &VectorStore,
    cache: Option<&L2Cache>,
    reranker: Option<&Reranker>,
    repository: &str,
    query: &str,
    embedding_text: Option<&[f32]>,
    embedding_code: Option<&[f32]>,
    filters: &SearchFilters,
    options: &SearchOptions,
) -> Result<SearchResponse, SearchError> {
    if !options.enable_lexical && !options.enable_vector {
        return Err(SearchError::BothMethodsDisabled);
    }
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let total_started = Instant::now();
    let cache_key = keys::search(query, repository, options.top_k);
    if let Some(cache) = cache {
        if let Some(cached) = cache.get::<SearchResponse>(&cache_key).await {
            return Ok(cached);
        }
    }

    let (lexical_weight, vector_weight) =
        if options.auto_weight { crate::weights::auto_weights(query) } else { (options.lexical_weight, options.vector_weight) };

    let lexical_started = Instant::now();
    let lexical_hits = if options.enable_lexical {
        ChunkRepo::new(db).lexical_search(query, repository, options.candidate_pool_size).await?
    } else {
        Vec::new()
    };
    let lexical_time_ms = lexical_started.elapsed().as_secs_f64() * 1000.0;

    let vector_started = Instant::now();
    let vector_hits = if options.enable_vector {
        let domain = if embedding_code.is_some() { EmbeddingDomain::Code } else { EmbeddingDomain::Text };
        let query_embedding = embedding_code.or(embedding_text);
        match query_embedding {
            Some(embedding) => {
                vector_store.search_chunks(embedding, domain, Some(repository), options.candidate_pool_size, options.ef_search)?
            }
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };
    let vector_time_ms = vector_started.elapsed().as_secs_f64() * 1000.0;

    // Drop low-quality vector matches, then re-rank the survivors
    // contiguously.
    let vector_ranked: Vec<String> =
        vector_hits.into_iter().filter(|hit| hit.score >= LOW_QUALITY_VECTOR_THRESHOLD).map(|hit| hit.id).collect();
    let lexical_ranked: Vec<String> = lexical_hits.iter().map(|hit| hit.chunk_id.clone()).collect();

    let fusion_started = Instant::now();
    let mut fused = fuse(&lexical_ranked, &vector_ranked, lexical_weight, vector_weight);
    let fusion_time_ms = fusion_started.elapsed().as_secs_f64() * 1000.0;

    let chunk_repo = ChunkRepo::new(db);
    if let Some(language) = filters.language.as_deref() {
        fused = filter_by_language(&chunk_repo, fused, language).await;
    }

    let mut rerank_time_ms = None;
    let mut rerank_scores: std::collections::HashMap<String, f32> = std::collections::HashMap::new();
    if options.rerank {
        if let Some(reranker) = reranker {
            let rerank_started = Instant::now();
            fused = apply_rerank(&chunk_repo, reranker, query, fused, options.rerank_pool_size as usize, &mut rerank_scores).await?;
            rerank_time_ms = Some(rerank_started.elapsed().as_secs_f64() * 1000.0);
        }
    }

    let start = options.offset as usize;
    let end = (start + options.top_k as usize).min(fused.len());
    let page = if start < fused.len() { &fused[start..end] } else { &[] };

    let mut results = Vec::with_capacity(page.len());
    for (i, candidate) in page.iter().enumerate() {
        let Ok(chunk) = chunk_repo.get(&candidate.id).await else {
            debug!(chunk_id = candidate.id, "fused candidate's chunk vanished before final fetch, skipping");
            continue;
        };
        results.push(ScoredResult {
            chunk_id: candidate.id.clone(),
            repository: chunk.repository,
            file_path: chunk.file_path,
            name: chunk.name,
            qualified_name: chunk.qualified_name,
            rank: (start + i + 1) as u32,
            rrf_score: candidate.rrf_score,
            lexical_rank: candidate.lexical_rank,
            vector_rank: candidate.vector_rank,
            rerank_score: rerank_scores.get(&candidate.id).copied(),
            contributions: candidate.contributions.clone(),
        });
    }

    let metadata = SearchMetadata {
        total_time_ms: total_started.elapsed().as_secs_f64() * 1000.0,
        lexical_time_ms,
        vector_time_ms,
        fusion_time_ms,
        rerank_time_ms,
        lexical_pool_size: lexical_ranked.len(),
        vector_pool_size: vector_ranked.len(),
        effective_lexical_weight: lexical_weight,
        effective_vector_weight: vector_weight,
    };
    let response = SearchResponse { results, metadata };

    if let Some(cache) = cache {
        cache.set(&cache_key, &response, Some(SEARCH_CACHE_TTL_SECS)).await;
    }

    Ok(response)
}

async fn filter_by_language(chunk_repo: &ChunkRepo<'_>, candidates: Vec<FusedCandidate>, language: &str) -> Vec<FusedCandidate> {
    let mut kept = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Ok(chunk) = chunk_repo.get(&candidate.id).await {
            if chunk.language == language {
                kept.push(candidate);
            }
        }
    }
    kept
}

/// Reranks the top `rerank_pool_size` candidates with a cross-encoder and
/// merges them back with the untouched tail, preserving its RRF order
/// applied after fusion.
async fn apply_rerank(
    chunk_repo: &ChunkRepo<'_>,
    reranker: &Reranker,
    query: &str,
    fused: Vec<FusedCandidate>,
    rerank_pool_size: usize,
    rerank_scores: &mut std::collections::HashMap<String, f32>,
) -> Result<Vec<FusedCandidate>, SearchError> {
    let pool_size = rerank_pool_size.min(fused.len());
    let (head, tail) = fused.split_at(pool_size);

    let mut previews = Vec::with_capacity(head.len());
    for candidate in head {
        let preview = match chunk_repo.get(&candidate.id).await {
            Ok(chunk) => chunk.source_text.chars().take(500).collect(),
            Err(_) => String::new(),
        };
        previews.push(preview);
    }

    let ranked = reranker.rerank(query, &previews)?;
    let mut reranked_head = Vec::with_capacity(head.len());
    for (original_index, score) in ranked {
        let candidate = head[original_index].clone();
        rerank_scores.insert(candidate.id.clone(), score);
        reranked_head.push(candidate);
    }

    reranked_head.extend(tail.iter().cloned());
    Ok(reranked_head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::entities::ChunkMetadata;
    use codegraph_core::{Chunk, ChunkKind};
    use codegraph_vector::VectorStore;

    async fn seed_chunk(db: &CodegraphDb, id: &str, name: &str) {
        let chunk = Chunk {
            id: id.into(),
            repository: "repo".into(),
            file_path: format!("{name}.py"),
            language: "python".into(),
            kind: ChunkKind::Function,
            name: name.into(),
            qualified_name: Some(name.into()),
            source_text: format!("def {name}():\n    pass"),
            start_line: 1,
            end_line: 2,
            commit_id: None,
            metadata: ChunkMetadata::default(),
            text_embedding: None,
            code_embedding: None,
            indexed_at: chrono::Utc::now(),
            last_modified_at: None,
            node_id: None,
        };
        ChunkRepo::new(db).upsert(&chunk).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_both_methods_disabled() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let vectors = VectorStore::open_in_memory().unwrap();
        let options = SearchOptions { enable_lexical: false, enable_vector: false, ..SearchOptions::default() };
        let result =
            search(&db, &vectors, None, None, "repo", "q", None, None, &SearchFilters::default(), &options).await;
        assert!(matches!(result, Err(SearchError::BothMethodsDisabled)));
    }

    #[tokio::test]
    async fn rejects_empty_query() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let vectors = VectorStore::open_in_memory().unwrap();
        let result = search(&db, &vectors, None, None, "repo", "   ", None, None, &SearchFilters::default(), &SearchOptions::default())
            .await;
        assert!(matches!(result, Err(SearchError::EmptyQuery)));
    }

    #[tokio::test]
    async fn lexical_only_search_finds_exact_match() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chunk(&db, "chunk_1", "validate_user_token").await;
        let vectors = VectorStore::open_in_memory().unwrap();
        let options = SearchOptions { enable_vector: false, ..SearchOptions::default() };

        let response = search(
            &db,
            &vectors,
            None,
            None,
            "repo",
            "validate_user_token",
            None,
            None,
            &SearchFilters::default(),
            &options,
        )
        .await
        .unwrap();

        assert!(response.results.iter().any(|r| r.chunk_id == "chunk_1"));
        assert_eq!(response.metadata.vector_pool_size, 0);
    }

    #[tokio::test]
    async fn language_filter_excludes_other_languages() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chunk(&db, "chunk_1", "save_user").await;
        let vectors = VectorStore::open_in_memory().unwrap();
        let filters = SearchFilters { language: Some("typescript".into()) };
        let options = SearchOptions { enable_vector: false, ..SearchOptions::default() };

        let response = search(&db, &vectors, None, None, "repo", "save_user", None, None, &filters, &options).await.unwrap();
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn offset_and_limit_page_results() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chunk(&db, "chunk_1", "alpha_save").await;
        seed_chunk(&db, "chunk_2", "alpha_load").await;
        let vectors = VectorStore::open_in_memory().unwrap();
        let options = SearchOptions { enable_vector: false, top_k: 1, offset: 0, ..SearchOptions::default() };

        let response = search(&db, &vectors, None, None, "repo", "alpha", None, None, &SearchFilters::default(), &options)
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].rank, 1);
    }
}
