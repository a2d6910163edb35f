//! Embedding service error types.

use thiserror::Error;

/// Errors raised by the dual-embedding service.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The circuit breaker is open; model loading/inference is refused
    /// until the recovery timeout elapses.
    #[error("embedding circuit breaker is {0}, retry after recovery timeout")]
    CircuitOpen(&'static str),

    /// Model initialization failed (download, ONNX runtime, cache issues).
    #[error("model initialization failed: {0}")]
    InitFailed(String),

    /// The code model was refused because resident memory already exceeds
    /// the configured cap.
    #[error("RAM budget exceeded ({used_mb:.1} MB > {cap_mb:.1} MB); refusing to load code model")]
    RamBudgetExceeded { used_mb: f64, cap_mb: f64 },

    /// Inference failed (ONNX runtime error, dimension mismatch).
    #[error("embedding generation failed: {0}")]
    EmbedFailed(String),

    /// The bounded wait around an inference call elapsed.
    #[error("embedding generation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
