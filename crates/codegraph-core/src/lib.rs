//! # codegraph-core
//!
//! Shared entity types, ids, and cross-cutting error types for the code
//! intelligence indexing and retrieval engine.
//!
//! This crate provides the foundational types shared across every other
//! crate in the workspace:
//! - Entity structs for the data model (chunks, graph nodes/edges, memory
//!   records, upload sessions, stream messages)
//! - Kind/status enums
//! - Content hashing (cache-key discriminator)
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod hash;
pub mod ids;

pub use entities::{Chunk, Edge, MemoryRecord, Node, ReExport, StreamMessage, UploadSession};
pub use enums::{ChunkKind, EdgeRelation, MemoryType, NodeKind, UploadStatus};
pub use errors::CoreError;
