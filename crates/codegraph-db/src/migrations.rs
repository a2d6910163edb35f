//! Migration runner. Embeds the SQL file at compile time and executes it
//! on database open; every statement uses `IF NOT EXISTS` for idempotent
//! re-running, matching `zen-db::migrations`.

use crate::db::CodegraphDb;
use crate::error::DatabaseError;

const MIGRATION_001: &str = include_str!("../migrations/001_initial.sql");

impl CodegraphDb {
    pub(crate) async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| DatabaseError::Migration(format!("001_initial: {e}")))?;
        Ok(())
    }
}
