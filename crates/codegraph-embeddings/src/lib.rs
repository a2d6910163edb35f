//! # codegraph-embeddings
//!
//! Dual text/code domain embedding service: lazy model
//! loading under double-checked locking, a shared circuit breaker, single
//! and batched inference, and a deterministic mock mode for tests.

pub mod circuit_breaker;
pub mod error;
pub mod mock;
pub mod service;

pub use circuit_breaker::CircuitBreaker;
pub use error::EmbeddingError;
pub use mock::mock_embedding;
pub use service::{EmbeddingResult, EmbeddingService, EmbeddingServiceConfig, DIMENSION};
