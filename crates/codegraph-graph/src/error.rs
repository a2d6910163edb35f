//! Graph-crate error type.

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Database(#[from] codegraph_db::DatabaseError),

    #[error(transparent)]
    LibSql(#[from] libsql::Error),

    #[error("failed to serialize cached graph result: {0}")]
    Serialization(#[from] serde_json::Error),
}
