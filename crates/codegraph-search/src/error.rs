//! Search-crate error type.

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("both lexical and vector search are disabled")]
    BothMethodsDisabled,

    #[error("query must not be empty")]
    EmptyQuery,

    #[error(transparent)]
    Database(#[from] codegraph_db::DatabaseError),

    #[error(transparent)]
    Vector(#[from] codegraph_vector::VectorError),

    #[error("failed to load reranker model: {0}")]
    RerankInit(String),

    #[error("reranker inference failed: {0}")]
    RerankFailed(String),

    #[error("failed to (de)serialize cached search result: {0}")]
    Serialization(#[from] serde_json::Error),
}
