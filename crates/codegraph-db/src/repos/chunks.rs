//! Chunk persistence and the FTS5-trigram lexical search path.

use codegraph_core::entities::ChunkMetadata;
use codegraph_core::{Chunk, ChunkKind};
use libsql::params;

use crate::db::CodegraphDb;
use crate::error::DatabaseError;
use crate::helpers::{from_json, parse_datetime, parse_optional_datetime, to_json};

/// One lexical-search candidate, carrying the chunk's display fields plus
/// a rank (lower is more relevant; `bm25`-derived).
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    pub chunk_id: String,
    pub repository: String,
    pub file_path: String,
    pub name: String,
    pub qualified_name: Option<String>,
    pub rank: f64,
}

pub struct ChunkRepo<'a> {
    db: &'a CodegraphDb,
}

impl<'a> ChunkRepo<'a> {
    #[must_use]
    pub fn new(db: &'a CodegraphDb) -> Self {
        Self { db }
    }

    /// Insert or replace a chunk by id — re-indexing the same file replaces
    /// its prior chunks rather than mutating them in place.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query or serialization failure.
    pub async fn upsert(&self, chunk: &Chunk) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO code_chunks (
                id, repository, file_path, language, kind, name, qualified_name,
                source_text, start_line, end_line, commit_id, metadata_json,
                has_text_embedding, has_code_embedding, indexed_at, last_modified_at, node_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                repository = excluded.repository,
                file_path = excluded.file_path,
                language = excluded.language,
                kind = excluded.kind,
                name = excluded.name,
                qualified_name = excluded.qualified_name,
                source_text = excluded.source_text,
                start_line = excluded.start_line,
                end_line = excluded.end_line,
                commit_id = excluded.commit_id,
                metadata_json = excluded.metadata_json,
                has_text_embedding = excluded.has_text_embedding,
                has_code_embedding = excluded.has_code_embedding,
                indexed_at = excluded.indexed_at,
                last_modified_at = excluded.last_modified_at,
                node_id = excluded.node_id",
            params![
                chunk.id.clone(),
                chunk.repository.clone(),
                chunk.file_path.clone(),
                chunk.language.clone(),
                chunk.kind.as_str(),
                chunk.name.clone(),
                chunk.qualified_name.clone(),
                chunk.source_text.clone(),
                chunk.start_line,
                chunk.end_line,
                chunk.commit_id.clone(),
                to_json(&chunk.metadata)?,
                i64::from(chunk.text_embedding.is_some()),
                i64::from(chunk.code_embedding.is_some()),
                chunk.indexed_at.to_rfc3339(),
                chunk.last_modified_at.map(|ts| ts.to_rfc3339()),
                chunk.node_id.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    /// Deletes every chunk for `file_path` within `repository` — the
    /// "replaced on re-indexing" lifecycle step.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn delete_by_file(&self, repository: &str, file_path: &str) -> Result<u64, DatabaseError> {
        let conn = self.db.connection();
        let affected = conn
            .execute("DELETE FROM code_chunks WHERE repository = ? AND file_path = ?", params![repository, file_path])
            .await?;
        Ok(affected)
    }

    /// Deletes every chunk owned by `repository` — used when a repository
    /// is fully re-indexed.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn delete_by_repository(&self, repository: &str) -> Result<u64, DatabaseError> {
        let conn = self.db.connection();
        let affected = conn.execute("DELETE FROM code_chunks WHERE repository = ?", params![repository]).await?;
        Ok(affected)
    }

    /// # Errors
    /// Returns [`DatabaseError::NotFound`] if no chunk has `id`.
    pub async fn get(&self, id: &str) -> Result<Chunk, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn.query("SELECT * FROM code_chunks WHERE id = ?", params![id]).await?;
        let Some(row) = rows.next().await? else {
            return Err(DatabaseError::NotFound(format!("chunk {id}")));
        };
        row_to_chunk(&row)
    }

    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn list_by_file(&self, repository: &str, file_path: &str) -> Result<Vec<Chunk>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn
            .query(
                "SELECT * FROM code_chunks WHERE repository = ? AND file_path = ? ORDER BY start_line",
                params![repository, file_path],
            )
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(row_to_chunk(&row)?);
        }
        Ok(chunks)
    }

    /// All chunks for `repository` across every language, in file/line
    /// order — the load step at the top of graph construction; each
    /// chunk carries its own `language` field so the
    /// construction pass can pick the right built-in skip list per chunk
    /// without a separate per-language query.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn list_by_repository(&self, repository: &str) -> Result<Vec<Chunk>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn
            .query(
                "SELECT * FROM code_chunks WHERE repository = ? ORDER BY file_path, start_line",
                params![repository],
            )
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(row_to_chunk(&row)?);
        }
        Ok(chunks)
    }

    /// All chunks for `(repository, language)`, in file/line order.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn list_by_repository_language(&self, repository: &str, language: &str) -> Result<Vec<Chunk>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn
            .query(
                "SELECT * FROM code_chunks WHERE repository = ? AND language = ? ORDER BY file_path, start_line",
                params![repository, language],
            )
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(row_to_chunk(&row)?);
        }
        Ok(chunks)
    }

    /// Lexical search: FTS5 trigram-tokenizer similarity plus a
    /// case-insensitive substring match on `name`, unioned and deduped,
    /// ordered by rank.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn lexical_search(&self, query: &str, repository: &str, limit: u32) -> Result<Vec<LexicalHit>, DatabaseError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.db.connection();

        let mut hits: Vec<LexicalHit> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let mut fts_rows = conn
            .query(
                "SELECT c.id, c.repository, c.file_path, c.name, c.qualified_name, bm25(code_chunks_fts) AS rank
                 FROM code_chunks_fts
                 JOIN code_chunks c ON c.id = code_chunks_fts.id
                 WHERE code_chunks_fts MATCH ? AND c.repository = ?
                 ORDER BY rank
                 LIMIT ?",
                params![query, repository, i64::from(limit)],
            )
            .await?;
        while let Some(row) = fts_rows.next().await? {
            let chunk_id: String = row.get(0)?;
            if seen.insert(chunk_id.clone()) {
                hits.push(LexicalHit {
                    chunk_id,
                    repository: row.get(1)?,
                    file_path: row.get(2)?,
                    name: row.get(3)?,
                    qualified_name: row.get::<Option<String>>(4)?,
                    rank: row.get(5)?,
                });
            }
        }

        // Guarantee exact-name retrieval of proper nouns even when the
        // trigram similarity cut excludes a short literal match.
        let like_pattern = format!("%{}%", query.to_lowercase());
        let mut like_rows = conn
            .query(
                "SELECT id, repository, file_path, name, qualified_name
                 FROM code_chunks
                 WHERE repository = ? AND lower(name) LIKE ?
                 LIMIT ?",
                params![repository, like_pattern, i64::from(limit)],
            )
            .await?;
        while let Some(row) = like_rows.next().await? {
            let chunk_id: String = row.get(0)?;
            if seen.insert(chunk_id.clone()) {
                hits.push(LexicalHit {
                    chunk_id,
                    repository: row.get(1)?,
                    file_path: row.get(2)?,
                    name: row.get(3)?,
                    qualified_name: row.get::<Option<String>>(4)?,
                    rank: 0.0,
                });
            }
        }

        hits.truncate(limit as usize);
        Ok(hits)
    }
}

fn row_to_chunk(row: &libsql::Row) -> Result<Chunk, DatabaseError> {
    let kind_str: String = row.get(4)?;
    let kind = chunk_kind_from_str(&kind_str)?;
    let metadata_json: String = row.get(11)?;
    let metadata: ChunkMetadata = from_json(&metadata_json)?;
    let indexed_at: String = row.get(14)?;
    let last_modified_at: Option<String> = row.get(15)?;

    Ok(Chunk {
        id: row.get(0)?,
        repository: row.get(1)?,
        file_path: row.get(2)?,
        language: row.get(3)?,
        kind,
        name: row.get(5)?,
        qualified_name: row.get::<Option<String>>(6)?,
        source_text: row.get(7)?,
        start_line: row.get::<i64>(8)? as u32,
        end_line: row.get::<i64>(9)? as u32,
        commit_id: row.get::<Option<String>>(10)?,
        metadata,
        text_embedding: None,
        code_embedding: None,
        indexed_at: parse_datetime(&indexed_at)?,
        last_modified_at: parse_optional_datetime(last_modified_at.as_deref())?,
        node_id: row.get::<Option<String>>(16)?,
    })
}

fn chunk_kind_from_str(s: &str) -> Result<ChunkKind, DatabaseError> {
    let json = serde_json::Value::String(s.to_string());
    serde_json::from_value(json).map_err(|e| DatabaseError::Query(format!("unknown chunk kind '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_chunk(id: &str, name: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            repository: "repo".into(),
            file_path: "api/services/user_service.py".into(),
            language: "python".into(),
            kind: ChunkKind::Method,
            name: name.to_string(),
            qualified_name: Some(format!("api.services.user_service.User.{name}")),
            source_text: format!("def {name}(self):\n    pass"),
            start_line: 10,
            end_line: 11,
            commit_id: None,
            metadata: ChunkMetadata::default(),
            text_embedding: None,
            code_embedding: None,
            indexed_at: Utc::now(),
            last_modified_at: None,
            node_id: None,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = ChunkRepo::new(&db);
        let chunk = sample_chunk("chunk_1", "save");
        repo.upsert(&chunk).await.unwrap();

        let fetched = repo.get("chunk_1").await.unwrap();
        assert_eq!(fetched.name, "save");
        assert_eq!(fetched.qualified_name.as_deref(), Some("api.services.user_service.User.save"));
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = ChunkRepo::new(&db);
        repo.upsert(&sample_chunk("chunk_1", "save")).await.unwrap();
        repo.upsert(&sample_chunk("chunk_1", "save_v2")).await.unwrap();

        let fetched = repo.get("chunk_1").await.unwrap();
        assert_eq!(fetched.name, "save_v2");
    }

    #[tokio::test]
    async fn delete_by_file_removes_only_matching_rows() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = ChunkRepo::new(&db);
        repo.upsert(&sample_chunk("chunk_1", "save")).await.unwrap();
        let mut other = sample_chunk("chunk_2", "load");
        other.file_path = "api/services/other.py".into();
        repo.upsert(&other).await.unwrap();

        let deleted = repo.delete_by_file("repo", "api/services/user_service.py").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(repo.get("chunk_1").await.is_err());
        assert!(repo.get("chunk_2").await.is_ok());
    }

    #[tokio::test]
    async fn list_by_repository_spans_all_languages() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = ChunkRepo::new(&db);
        repo.upsert(&sample_chunk("chunk_1", "save")).await.unwrap();
        let mut ts_chunk = sample_chunk("chunk_2", "load");
        ts_chunk.language = "typescript".into();
        repo.upsert(&ts_chunk).await.unwrap();

        let chunks = repo.list_by_repository("repo").await.unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[tokio::test]
    async fn lexical_search_finds_exact_name_substring() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = ChunkRepo::new(&db);
        repo.upsert(&sample_chunk("chunk_1", "validate_user_token")).await.unwrap();

        let hits = repo.lexical_search("validate_user_token", "repo", 10).await.unwrap();
        assert!(hits.iter().any(|h| h.chunk_id == "chunk_1"));
    }

    #[tokio::test]
    async fn lexical_search_on_empty_query_returns_nothing() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = ChunkRepo::new(&db);
        let hits = repo.lexical_search("", "repo", 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
