//! Indexing-crate error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Database(#[from] codegraph_db::DatabaseError),

    #[error(transparent)]
    Vector(#[from] codegraph_vector::VectorError),

    #[error(transparent)]
    Graph(#[from] codegraph_graph::GraphError),
}
