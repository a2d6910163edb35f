//! Language-server client error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LspError {
    #[error("language server failed to initialize: {0}")]
    InitializationFailed(String),

    #[error("language server communication error: {0}")]
    Communication(String),

    #[error("language server request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("language server crashed with exit code {0:?}")]
    ServerCrashed(Option<i32>),

    #[error("language server not running")]
    NotRunning,
}
