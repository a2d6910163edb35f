//! Stream-crate error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Database(#[from] codegraph_db::DatabaseError),

    #[error(transparent)]
    Graph(#[from] codegraph_graph::GraphError),

    #[error("malformed stream entry: missing or unparseable fields")]
    MalformedEntry,

    #[error("subprocess worker timed out after {0:?}")]
    WorkerTimeout(std::time::Duration),

    #[error("subprocess worker exited with status {0}: {1}")]
    WorkerFailed(i32, String),

    #[error("failed to spawn subprocess worker: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("failed to parse subprocess worker output: {0}")]
    WorkerOutput(String),
}
