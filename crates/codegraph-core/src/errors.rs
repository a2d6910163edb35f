//! Cross-cutting error types.
//!
//! Domain-specific errors (`ParserError`, `DatabaseError`, `LspError`, ...)
//! live in their owning crates. `CoreError` covers failures that can
//! originate anywhere entity validation or lookup happens.

use thiserror::Error;

/// Errors that can be raised while working with core entity types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// Data failed validation (schema, format, constraints).
    #[error("validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
