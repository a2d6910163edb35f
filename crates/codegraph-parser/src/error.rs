//! Parser error types.

use thiserror::Error;

/// Errors from chunking and metadata extraction. Per the failure policy,
/// callers catch these at the orchestrator boundary and fall back rather
/// than abort indexing of a file.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("source code is empty")]
    EmptySource,

    #[error("parse timed out after {0:?}")]
    ParseTimeout(std::time::Duration),

    #[error("parser thread panicked")]
    ParseThreadPanicked,

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
}
