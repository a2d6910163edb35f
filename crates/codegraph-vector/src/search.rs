//! Cosine similarity search against the HNSW indexes, grounded on
//! `zen-search::vector`'s brute-force `array_cosine_similarity()` queries,
//! swapped for the `vss` extension's indexed path.

use codegraph_core::enums::EmbeddingDomain;
use duckdb::params;

use crate::error::VectorError;
use crate::store::VectorStore;
use crate::util::{check_dimension, vec_to_sql};

/// One similarity hit: the bare id and score, joined back against
/// `codegraph-db` by the caller for display fields.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    /// Cosine similarity in `[-1, 1]`, derived from the index's `1 - distance`.
    pub score: f64,
}

impl VectorStore {
    /// Searches `chunk_vectors` on the `embedding_text` or `embedding_code`
    /// column, optionally scoped to a repository.
    ///
    /// # Errors
    /// Returns [`VectorError::WrongDimension`] if `query_embedding` isn't
    /// 768-wide, an error variant if `domain` is [`EmbeddingDomain::Hybrid`]
    /// (not a storable column), or [`VectorError::DuckDb`] on a query
    /// failure.
    pub fn search_chunks(
        &self,
        query_embedding: &[f32],
        domain: EmbeddingDomain,
        repository: Option<&str>,
        limit: u32,
        ef_search: u32,
    ) -> Result<Vec<VectorHit>, VectorError> {
        check_dimension(query_embedding)?;
        let column = domain_column(domain)?;
        let query_sql = format!("{}::FLOAT[768]", vec_to_sql(query_embedding));

        let conn = self.lock()?;
        conn.execute_batch(&format!("SET hnsw_ef_search = {ef_search};"))?;

        let sql = repository.map_or_else(
            || {
                format!(
                    "SELECT id, array_cosine_similarity({column}, {query_sql}) AS score
                     FROM chunk_vectors WHERE {column} IS NOT NULL
                     ORDER BY score DESC LIMIT ?"
                )
            },
            |_| {
                format!(
                    "SELECT id, array_cosine_similarity({column}, {query_sql}) AS score
                     FROM chunk_vectors WHERE {column} IS NOT NULL AND repository = ?
                     ORDER BY score DESC LIMIT ?"
                )
            },
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = if let Some(repo) = repository {
            stmt.query_map(params![repo, limit], |row| Ok(VectorHit { id: row.get(0)?, score: row.get(1)? }))?
        } else {
            stmt.query_map(params![limit], |row| Ok(VectorHit { id: row.get(0)?, score: row.get(1)? }))?
        };

        let mut hits = Vec::new();
        for row in rows {
            hits.push(row?);
        }
        Ok(hits)
    }

    /// Searches `memory_vectors`.
    ///
    /// # Errors
    /// Same as [`Self::search_chunks`] (domain is always `embedding`).
    pub fn search_memories(&self, query_embedding: &[f32], limit: u32, ef_search: u32) -> Result<Vec<VectorHit>, VectorError> {
        check_dimension(query_embedding)?;
        let query_sql = format!("{}::FLOAT[768]", vec_to_sql(query_embedding));

        let conn = self.lock()?;
        conn.execute_batch(&format!("SET hnsw_ef_search = {ef_search};"))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, array_cosine_similarity(embedding, {query_sql}) AS score
             FROM memory_vectors WHERE embedding IS NOT NULL
             ORDER BY score DESC LIMIT ?"
        ))?;
        let rows = stmt.query_map(params![limit], |row| Ok(VectorHit { id: row.get(0)?, score: row.get(1)? }))?;

        let mut hits = Vec::new();
        for row in rows {
            hits.push(row?);
        }
        Ok(hits)
    }
}

fn domain_column(domain: EmbeddingDomain) -> Result<&'static str, VectorError> {
    match domain {
        EmbeddingDomain::Text => Ok("embedding_text"),
        EmbeddingDomain::Code => Ok("embedding_code"),
        EmbeddingDomain::Hybrid => Err(VectorError::UnsupportedDomain(domain)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(seed: f32) -> Vec<f32> {
        (0..768).map(|i| (seed + i as f32 / 768.0).sin()).collect()
    }

    #[test]
    fn self_match_scores_highest() {
        let store = VectorStore::open_in_memory().unwrap();
        let target = emb(1.0);
        store.upsert_chunk_embeddings("chunk_1", "repo", Some(&target), None).unwrap();
        store.upsert_chunk_embeddings("chunk_2", "repo", Some(&emb(90.0)), None).unwrap();

        let hits = store.search_chunks(&target, EmbeddingDomain::Text, None, 10, 100).unwrap();
        assert_eq!(hits[0].id, "chunk_1");
        assert!(hits[0].score > 0.99);
    }

    #[test]
    fn repository_filter_excludes_other_repos() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert_chunk_embeddings("chunk_1", "repo_a", Some(&emb(1.0)), None).unwrap();
        store.upsert_chunk_embeddings("chunk_2", "repo_b", Some(&emb(1.1)), None).unwrap();

        let hits = store.search_chunks(&emb(1.0), EmbeddingDomain::Text, Some("repo_a"), 10, 100).unwrap();
        assert!(hits.iter().all(|h| h.id == "chunk_1"));
    }

    #[test]
    fn code_domain_only_matches_code_column() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert_chunk_embeddings("chunk_1", "repo", None, Some(&emb(1.0))).unwrap();

        let hits = store.search_chunks(&emb(1.0), EmbeddingDomain::Text, None, 10, 100).unwrap();
        assert!(hits.is_empty());

        let hits = store.search_chunks(&emb(1.0), EmbeddingDomain::Code, None, 10, 100).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn empty_store_returns_empty() {
        let store = VectorStore::open_in_memory().unwrap();
        let hits = store.search_chunks(&emb(1.0), EmbeddingDomain::Text, None, 10, 100).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn memory_search_roundtrips() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert_memory_embedding("memory_1", &emb(5.0)).unwrap();
        let hits = store.search_memories(&emb(5.0), 10, 100).unwrap();
        assert_eq!(hits[0].id, "memory_1");
    }
}
