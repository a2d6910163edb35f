//! Free-text memory record CRUD + soft delete.

use chrono::Utc;
use codegraph_core::{MemoryRecord, MemoryType};
use libsql::params;

use crate::db::CodegraphDb;
use crate::error::DatabaseError;
use crate::helpers::{from_json, parse_datetime, parse_optional_datetime, to_json};
use crate::repos::chunks::LexicalHit;

pub struct MemoryRepo<'a> {
    db: &'a CodegraphDb,
}

impl<'a> MemoryRepo<'a> {
    #[must_use]
    pub fn new(db: &'a CodegraphDb) -> Self {
        Self { db }
    }

    /// # Errors
    /// Returns [`DatabaseError`] on a query failure, or propagates the
    /// caller's validation failure if `record` violates the data-model
    /// invariants (non-empty title/content).
    pub async fn create(&self, record: &MemoryRecord) -> Result<(), DatabaseError> {
        record.validate().map_err(|e| DatabaseError::InvalidState(e.to_string()))?;
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO memories (
                id, title, content, memory_type, tags_json, author, project_id,
                related_chunk_ids_json, created_at, updated_at, deleted_at,
                has_embedding, embedding_model
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id.clone(),
                record.title.clone(),
                record.content.clone(),
                record.memory_type.to_string(),
                to_json(&record.tags)?,
                record.author.clone(),
                record.project_id.clone(),
                to_json(&record.related_chunk_ids)?,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
                record.deleted_at.map(|ts| ts.to_rfc3339()),
                i64::from(record.embedding.is_some()),
                record.embedding_model.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    /// # Errors
    /// Returns [`DatabaseError::NotFound`] if no non-deleted memory has
    /// `id`.
    pub async fn get(&self, id: &str) -> Result<MemoryRecord, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn.query("SELECT * FROM memories WHERE id = ?", params![id]).await?;
        let Some(row) = rows.next().await? else {
            return Err(DatabaseError::NotFound(format!("memory {id}")));
        };
        row_to_memory(&row)
    }

    /// Marks a memory deleted without removing the row — "a soft-deleted
    /// record must precede any permanent deletion.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn soft_delete(&self, id: &str) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "UPDATE memories SET deleted_at = ?, updated_at = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), Utc::now().to_rfc3339(), id],
        )
        .await?;
        Ok(())
    }

    /// Permanently removes a memory row. Must only be called on a record
    /// that has already been soft-deleted.
    ///
    /// # Errors
    /// Returns [`DatabaseError::InvalidState`] if the record is not
    /// soft-deleted, or [`DatabaseError`] on a query failure.
    pub async fn hard_delete(&self, id: &str) -> Result<(), DatabaseError> {
        let existing = self.get_including_deleted(id).await?;
        if existing.deleted_at.is_none() {
            return Err(DatabaseError::InvalidState(format!("memory {id} must be soft-deleted before hard delete")));
        }
        let conn = self.db.connection();
        conn.execute("DELETE FROM memories WHERE id = ?", params![id]).await?;
        Ok(())
    }

    async fn get_including_deleted(&self, id: &str) -> Result<MemoryRecord, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn.query("SELECT * FROM memories WHERE id = ?", params![id]).await?;
        let Some(row) = rows.next().await? else {
            return Err(DatabaseError::NotFound(format!("memory {id}")));
        };
        row_to_memory(&row)
    }

    /// Lists non-deleted memories, optionally filtered by project.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn list(&self, project_id: Option<&str>) -> Result<Vec<MemoryRecord>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = match project_id {
            Some(project) => {
                conn.query(
                    "SELECT * FROM memories WHERE deleted_at IS NULL AND project_id = ? ORDER BY created_at DESC",
                    params![project],
                )
                .await?
            }
            None => {
                conn.query("SELECT * FROM memories WHERE deleted_at IS NULL ORDER BY created_at DESC", ())
                    .await?
            }
        };
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_memory(&row)?);
        }
        Ok(records)
    }

    /// Lexical search over `title`/`content`, mirroring
    /// [`crate::repos::chunks::ChunkRepo::lexical_search`] but scoped to
    /// non-deleted memories.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn lexical_search(&self, query: &str, limit: u32) -> Result<Vec<LexicalHit>, DatabaseError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.db.connection();
        let mut rows = conn
            .query(
                "SELECT m.id, m.title, bm25(memories_fts) AS rank
                 FROM memories_fts
                 JOIN memories m ON m.id = memories_fts.id
                 WHERE memories_fts MATCH ? AND m.deleted_at IS NULL
                 ORDER BY rank
                 LIMIT ?",
                params![query, i64::from(limit)],
            )
            .await?;
        let mut hits = Vec::new();
        while let Some(row) = rows.next().await? {
            hits.push(LexicalHit {
                chunk_id: row.get(0)?,
                repository: String::new(),
                file_path: String::new(),
                name: row.get(1)?,
                qualified_name: None,
                rank: row.get(2)?,
            });
        }
        Ok(hits)
    }
}

fn row_to_memory(row: &libsql::Row) -> Result<MemoryRecord, DatabaseError> {
    let memory_type_str: String = row.get(3)?;
    let memory_type = memory_type_from_str(&memory_type_str)?;
    let tags_json: String = row.get(4)?;
    let related_json: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    let deleted_at: Option<String> = row.get(10)?;

    Ok(MemoryRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        memory_type,
        tags: from_json(&tags_json)?,
        author: row.get::<Option<String>>(5)?,
        project_id: row.get::<Option<String>>(6)?,
        related_chunk_ids: from_json(&related_json)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
        deleted_at: parse_optional_datetime(deleted_at.as_deref())?,
        embedding: None,
        embedding_model: row.get::<Option<String>>(12)?,
    })
}

fn memory_type_from_str(s: &str) -> Result<MemoryType, DatabaseError> {
    match s {
        "note" => Ok(MemoryType::Note),
        "decision" => Ok(MemoryType::Decision),
        "conversation" => Ok(MemoryType::Conversation),
        other => Err(DatabaseError::Query(format!("unknown memory type '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            title: "design decision".into(),
            content: "use RRF instead of alpha blending".into(),
            memory_type: MemoryType::Decision,
            tags: vec!["search".into()],
            author: None,
            project_id: Some("proj_1".into()),
            related_chunk_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            embedding: None,
            embedding_model: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = MemoryRepo::new(&db);
        repo.create(&sample("mem_1")).await.unwrap();
        let fetched = repo.get("mem_1").await.unwrap();
        assert_eq!(fetched.title, "design decision");
    }

    #[tokio::test]
    async fn create_rejects_invalid_record() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = MemoryRepo::new(&db);
        let mut invalid = sample("mem_1");
        invalid.title = String::new();
        assert!(repo.create(&invalid).await.is_err());
    }

    #[tokio::test]
    async fn hard_delete_requires_prior_soft_delete() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = MemoryRepo::new(&db);
        repo.create(&sample("mem_1")).await.unwrap();

        assert!(repo.hard_delete("mem_1").await.is_err());
        repo.soft_delete("mem_1").await.unwrap();
        assert!(repo.hard_delete("mem_1").await.is_ok());
    }

    #[tokio::test]
    async fn list_excludes_soft_deleted() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = MemoryRepo::new(&db);
        repo.create(&sample("mem_1")).await.unwrap();
        repo.soft_delete("mem_1").await.unwrap();

        let listed = repo.list(None).await.unwrap();
        assert!(listed.is_empty());
    }
}
