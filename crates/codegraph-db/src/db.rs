//! Connection handle: one libSQL connection per process, cloned behind an
//! `Arc` — libSQL connections are safe to share across tasks.

use std::sync::Arc;

use libsql::{Builder, Connection};
use tracing::info;

use crate::error::DatabaseError;

#[derive(Clone)]
pub struct CodegraphDb {
    pub(crate) conn: Arc<Connection>,
}

impl CodegraphDb {
    /// Open a local (file or `:memory:`) libSQL database and run
    /// migrations.
    ///
    /// # Errors
    /// Returns [`DatabaseError::LibSql`] if the database cannot be opened,
    /// or [`DatabaseError::Migration`] if the schema migration fails.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        info!(path, "opening codegraph database");
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        let instance = Self { conn: Arc::new(conn) };
        instance.run_migrations().await?;
        Ok(instance)
    }

    /// Opens an in-memory database, primarily for tests.
    ///
    /// # Errors
    /// Same as [`Self::open`].
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open(":memory:").await
    }

    /// Direct access to the underlying connection for crates (e.g.
    /// `codegraph-graph`'s recursive-CTE traversal) that issue raw SQL not
    /// covered by a repo method.
    #[must_use]
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.conn)
    }
}
