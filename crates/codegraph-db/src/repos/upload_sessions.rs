//! Upload/batch-indexing progress session persistence.

use chrono::Utc;
use codegraph_core::entities::StageCounters;
use codegraph_core::{UploadSession, UploadStatus};
use libsql::params;

use crate::db::CodegraphDb;
use crate::error::DatabaseError;
use crate::helpers::{from_json, parse_datetime, to_json};

pub struct UploadSessionRepo<'a> {
    db: &'a CodegraphDb,
}

impl<'a> UploadSessionRepo<'a> {
    #[must_use]
    pub fn new(db: &'a CodegraphDb) -> Self {
        Self { db }
    }

    /// # Errors
    /// Returns [`DatabaseError`] on a query or serialization failure.
    pub async fn create(&self, session: &UploadSession) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO upload_sessions (
                id, repository, total_files, parsed, chunked, embedded, stored, graphed,
                current_file, errors_json, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                session.id.clone(),
                session.repository.clone(),
                session.total_files,
                session.counters.parsed,
                session.counters.chunked,
                session.counters.embedded,
                session.counters.stored,
                session.counters.graphed,
                session.current_file.clone(),
                to_json(&session.errors)?,
                session.status.to_string(),
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    /// Persists the full session state, after the caller has called
    /// [`UploadSession::refresh_status`].
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query or serialization failure.
    pub async fn update(&self, session: &UploadSession) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "UPDATE upload_sessions SET
                parsed = ?, chunked = ?, embedded = ?, stored = ?, graphed = ?,
                current_file = ?, errors_json = ?, status = ?, updated_at = ?
             WHERE id = ?",
            params![
                session.counters.parsed,
                session.counters.chunked,
                session.counters.embedded,
                session.counters.stored,
                session.counters.graphed,
                session.current_file.clone(),
                to_json(&session.errors)?,
                session.status.to_string(),
                Utc::now().to_rfc3339(),
                session.id.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    /// # Errors
    /// Returns [`DatabaseError::NotFound`] if no session has `id`.
    pub async fn get(&self, id: &str) -> Result<UploadSession, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn.query("SELECT * FROM upload_sessions WHERE id = ?", params![id]).await?;
        let Some(row) = rows.next().await? else {
            return Err(DatabaseError::NotFound(format!("upload session {id}")));
        };
        row_to_session(&row)
    }

    /// Sessions not yet in a terminal status, for the consumer to resume
    /// from abandoned in-flight batches after a crash.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn list_active(&self, repository: &str) -> Result<Vec<UploadSession>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn
            .query(
                "SELECT * FROM upload_sessions
                 WHERE repository = ? AND status IN ('initializing', 'processing')
                 ORDER BY created_at",
                params![repository],
            )
            .await?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await? {
            sessions.push(row_to_session(&row)?);
        }
        Ok(sessions)
    }
}

fn row_to_session(row: &libsql::Row) -> Result<UploadSession, DatabaseError> {
    let errors_json: String = row.get(9)?;
    let status_str: String = row.get(10)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(UploadSession {
        id: row.get(0)?,
        repository: row.get(1)?,
        total_files: row.get::<i64>(2)? as u32,
        counters: StageCounters {
            parsed: row.get::<i64>(3)? as u32,
            chunked: row.get::<i64>(4)? as u32,
            embedded: row.get::<i64>(5)? as u32,
            stored: row.get::<i64>(6)? as u32,
            graphed: row.get::<i64>(7)? as u32,
        },
        current_file: row.get::<Option<String>>(8)?,
        errors: from_json(&errors_json)?,
        status: upload_status_from_str(&status_str)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn upload_status_from_str(s: &str) -> Result<UploadStatus, DatabaseError> {
    match s {
        "initializing" => Ok(UploadStatus::Initializing),
        "processing" => Ok(UploadStatus::Processing),
        "completed" => Ok(UploadStatus::Completed),
        "partial" => Ok(UploadStatus::Partial),
        "error" => Ok(UploadStatus::Error),
        other => Err(DatabaseError::Query(format!("unknown upload status '{other}'"))),
    }
}
