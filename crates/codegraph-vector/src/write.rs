//! Upsert paths, called from `codegraph-index`'s per-file persist step
//! right alongside `codegraph-db::ChunkRepo::upsert`: the relational store
//! keeps `has_text_embedding`/`has_code_embedding`
//! flags, the vectors themselves live only here.

use duckdb::params;

use crate::error::VectorError;
use crate::store::VectorStore;
use crate::util::{check_dimension, vec_to_sql};

impl VectorStore {
    /// Inserts or replaces a chunk's embeddings. Either domain may be
    /// `None` (e.g. a chunk with only a code-domain vector generated).
    ///
    /// # Errors
    /// Returns [`VectorError::WrongDimension`] if a provided vector isn't
    /// 768-wide, or [`VectorError::DuckDb`] on a query failure.
    pub fn upsert_chunk_embeddings(
        &self,
        chunk_id: &str,
        repository: &str,
        text_embedding: Option<&[f32]>,
        code_embedding: Option<&[f32]>,
    ) -> Result<(), VectorError> {
        if let Some(v) = text_embedding {
            check_dimension(v)?;
        }
        if let Some(v) = code_embedding {
            check_dimension(v)?;
        }

        let text_sql = text_embedding.map_or_else(|| "NULL".to_string(), |v| format!("{}::FLOAT[768]", vec_to_sql(v)));
        let code_sql = code_embedding.map_or_else(|| "NULL".to_string(), |v| format!("{}::FLOAT[768]", vec_to_sql(v)));

        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO chunk_vectors (id, repository, embedding_text, embedding_code)
                 VALUES (?, ?, {text_sql}, {code_sql})
                 ON CONFLICT (id) DO UPDATE SET
                    repository = excluded.repository,
                    embedding_text = excluded.embedding_text,
                    embedding_code = excluded.embedding_code"
            ),
            params![chunk_id, repository],
        )?;
        Ok(())
    }

    /// Inserts or replaces a memory record's embedding.
    ///
    /// # Errors
    /// Same as [`Self::upsert_chunk_embeddings`].
    pub fn upsert_memory_embedding(&self, memory_id: &str, embedding: &[f32]) -> Result<(), VectorError> {
        check_dimension(embedding)?;
        let embedding_sql = format!("{}::FLOAT[768]", vec_to_sql(embedding));

        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO memory_vectors (id, embedding) VALUES (?, {embedding_sql})
                 ON CONFLICT (id) DO UPDATE SET embedding = excluded.embedding"
            ),
            params![memory_id],
        )?;
        Ok(())
    }

    /// Deletes every chunk vector for `repository` — a re-index wipes the
    /// repository's vectors wholesale, mirroring `ChunkRepo::delete_by_repository`.
    ///
    /// # Errors
    /// Returns [`VectorError::DuckDb`] on a query failure.
    pub fn delete_chunk_vectors_by_repository(&self, repository: &str) -> Result<usize, VectorError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM chunk_vectors WHERE repository = ?", params![repository])?;
        Ok(affected)
    }

    /// Deletes a single chunk's vectors (e.g. the chunk was dropped on
    /// re-chunking a modified file).
    ///
    /// # Errors
    /// Returns [`VectorError::DuckDb`] on a query failure.
    pub fn delete_chunk_vector(&self, chunk_id: &str) -> Result<usize, VectorError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM chunk_vectors WHERE id = ?", params![chunk_id])?;
        Ok(affected)
    }

    /// Deletes a memory's vector (e.g. the memory was soft-deleted).
    ///
    /// # Errors
    /// Returns [`VectorError::DuckDb`] on a query failure.
    pub fn delete_memory_vector(&self, memory_id: &str) -> Result<usize, VectorError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM memory_vectors WHERE id = ?", params![memory_id])?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(seed: f32) -> Vec<f32> {
        (0..768).map(|i| (seed + i as f32 / 768.0).sin()).collect()
    }

    #[test]
    fn upsert_then_replace_chunk_embeddings() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert_chunk_embeddings("chunk_1", "repo", Some(&emb(1.0)), None).unwrap();
        store.upsert_chunk_embeddings("chunk_1", "repo", Some(&emb(1.0)), Some(&emb(2.0))).unwrap();

        let conn = store.lock().unwrap();
        let has_code: bool = conn
            .query_row(
                "SELECT embedding_code IS NOT NULL FROM chunk_vectors WHERE id = 'chunk_1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(has_code);
    }

    #[test]
    fn rejects_wrong_dimension_embedding() {
        let store = VectorStore::open_in_memory().unwrap();
        let short = vec![0.0_f32; 100];
        let result = store.upsert_chunk_embeddings("chunk_1", "repo", Some(&short), None);
        assert!(matches!(result, Err(VectorError::WrongDimension { .. })));
    }

    #[test]
    fn delete_by_repository_removes_matching_rows() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert_chunk_embeddings("chunk_1", "repo_a", Some(&emb(1.0)), None).unwrap();
        store.upsert_chunk_embeddings("chunk_2", "repo_b", Some(&emb(2.0)), None).unwrap();

        let deleted = store.delete_chunk_vectors_by_repository("repo_a").unwrap();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn memory_embedding_roundtrip() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert_memory_embedding("memory_1", &emb(3.0)).unwrap();
        let deleted = store.delete_memory_vector("memory_1").unwrap();
        assert_eq!(deleted, 1);
    }
}
