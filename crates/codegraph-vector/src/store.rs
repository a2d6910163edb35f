//! Schema setup for the vector store: two `FLOAT[768]` tables (one for
//! chunk embeddings, one for memory embeddings) each backed by a
//! `vss` HNSW index, grounded on `zen-lake`'s `spike_duckdb_vss` spike and
//! `zen-search::vector`'s brute-force predecessor.

use std::sync::Mutex;

use duckdb::Connection;
use tracing::info;

use crate::error::VectorError;

/// Dimension every embedding in this store must carry: both text- and
/// code-domain vectors are fixed at 768.
pub const DIMENSION: usize = 768;

/// A `DuckDB` connection plus the HNSW-indexed tables it owns.
///
/// `DuckDB`'s `Connection` is `Send` but not safely shared without
/// synchronization once multiple async tasks hold a reference, so every
/// method takes the lock internally; callers on the async side should wrap
/// calls in `spawn_blocking`.
pub struct VectorStore {
    conn: Mutex<Connection>,
}

impl VectorStore {
    /// Opens (or creates) a `DuckDB` file at `path`, loads the `vss`
    /// extension, and runs schema setup.
    ///
    /// # Errors
    /// Returns [`VectorError::DuckDb`] if the file cannot be opened or any
    /// setup statement fails.
    pub fn open(path: &str) -> Result<Self, VectorError> {
        info!(path, "opening vector store");
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.setup()?;
        Ok(store)
    }

    /// Opens an in-memory store, primarily for tests.
    ///
    /// # Errors
    /// Same as [`Self::open`].
    pub fn open_in_memory() -> Result<Self, VectorError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.setup()?;
        Ok(store)
    }

    fn setup(&self) -> Result<(), VectorError> {
        let conn = self.lock()?;
        conn.execute_batch("INSTALL vss; LOAD vss; SET hnsw_enable_experimental_persistence = true;")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunk_vectors (
                id TEXT PRIMARY KEY,
                repository TEXT NOT NULL,
                embedding_text FLOAT[768],
                embedding_code FLOAT[768]
            );
            CREATE TABLE IF NOT EXISTS memory_vectors (
                id TEXT PRIMARY KEY,
                embedding FLOAT[768]
            );",
        )?;
        // HNSW indexes require at least one row to build against an empty
        // table in some DuckDB versions; guarded with IF NOT EXISTS so
        // reopening an existing store never errors.
        create_index_if_absent(&conn, "idx_chunk_vectors_text", "chunk_vectors", "embedding_text")?;
        create_index_if_absent(&conn, "idx_chunk_vectors_code", "chunk_vectors", "embedding_code")?;
        create_index_if_absent(&conn, "idx_memory_vectors_embedding", "memory_vectors", "embedding")?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, VectorError> {
        self.conn.lock().map_err(|_| VectorError::LockPoisoned)
    }
}

fn create_index_if_absent(conn: &Connection, index_name: &str, table: &str, column: &str) -> Result<(), VectorError> {
    let exists: i64 = conn.query_row(
        "SELECT count(*) FROM duckdb_indexes() WHERE index_name = ?",
        [index_name],
        |row| row.get(0),
    )?;
    if exists == 0 {
        conn.execute_batch(&format!(
            "CREATE INDEX {index_name} ON {table} USING HNSW ({column}) WITH (metric = 'cosine')"
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_in_memory_and_creates_indexes() {
        let store = VectorStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM duckdb_indexes()", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn vss_extension_is_loaded() {
        let store = VectorStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let loaded: bool = conn
            .query_row(
                "SELECT loaded FROM duckdb_extensions() WHERE extension_name = 'vss'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(loaded);
    }

    #[test]
    fn reopening_an_existing_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.duckdb");
        let path_str = path.to_str().unwrap().to_string();

        let store1 = VectorStore::open(&path_str).unwrap();
        drop(store1);
        let store2 = VectorStore::open(&path_str).unwrap();
        let conn = store2.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM duckdb_indexes()", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }
}
