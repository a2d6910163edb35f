use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::enums::ChunkKind;

/// A semantically meaningful slice of source code produced by the AST
/// chunker, carrying its own metadata and (once embedded) its vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub repository: String,
    pub file_path: String,
    pub language: String,
    pub kind: ChunkKind,
    /// Simple name, e.g. `save`. Empty for anonymous/fallback chunks.
    pub name: String,
    /// Hierarchical dot-joined qualified name, e.g.
    /// `api.services.user_service.User.save`. Populated after indexing for
    /// all non-fallback chunks.
    pub qualified_name: Option<String>,
    pub source_text: String,
    pub start_line: u32,
    pub end_line: u32,
    pub commit_id: Option<String>,
    pub metadata: ChunkMetadata,
    /// 768-dimensional text-domain embedding, when present.
    pub text_embedding: Option<Vec<f32>>,
    /// 768-dimensional code-domain embedding, when present.
    pub code_embedding: Option<Vec<f32>>,
    pub indexed_at: DateTime<Utc>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub node_id: Option<String>,
}

/// A single re-export statement recovered from a barrel file, e.g.
/// `export { A as B } from 'src'`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReExport {
    /// The exported symbol name (`B` above), or `"*"` for a wildcard.
    pub symbol: String,
    /// The module the symbol is re-exported from (`'src'` above).
    pub source: String,
    /// The original name before renaming (`A` above), if renamed.
    pub original: Option<String>,
    /// `true` for `export type { T }` style type-only re-exports.
    pub is_type: bool,
}

/// Free-form metadata extracted alongside a chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChunkMetadata {
    pub imports: Vec<String>,
    pub calls: Vec<String>,
    pub re_exports: Vec<ReExport>,
    /// Cyclomatic-style complexity numbers, keyed by metric name
    /// (`"cyclomatic"`, `"cognitive"`, ...).
    pub complexity: HashMap<String, u32>,
    pub type_signature: Option<String>,
    pub parameter_types: Option<HashMap<String, String>>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
    pub base_classes: Vec<String>,
    pub doc_summary: Option<String>,
}

impl Chunk {
    /// Content hash over `source_text`, used as the cache-key discriminator.
    #[must_use]
    pub fn content_hash(&self) -> String {
        crate::hash::content_hash(&self.source_text)
    }

    /// `true` for chunks the graph constructor should skip entirely: the
    /// embedding invariant that vectors, when present, must be 768-wide.
    #[must_use]
    pub fn embeddings_valid(&self) -> bool {
        self.text_embedding.as_ref().is_none_or(|v| v.len() == 768)
            && self.code_embedding.as_ref().is_none_or(|v| v.len() == 768)
    }

    /// `true` when the chunk's name was synthesized (anonymous function
    /// expression, fallback-fixed slice) rather than extracted from source.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty() || self.name.starts_with("anonymous_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk {
            id: "chunk_0000000000000001".into(),
            repository: "repo".into(),
            file_path: "api/services/user_service.py".into(),
            language: "python".into(),
            kind: ChunkKind::Method,
            name: "save".into(),
            qualified_name: Some("api.services.user_service.User.save".into()),
            source_text: "def save(self):\n    pass".into(),
            start_line: 10,
            end_line: 11,
            commit_id: None,
            metadata: ChunkMetadata::default(),
            text_embedding: None,
            code_embedding: None,
            indexed_at: Utc::now(),
            last_modified_at: None,
            node_id: None,
        }
    }

    #[test]
    fn content_hash_is_stable_for_identical_source() {
        let a = sample_chunk();
        let mut b = sample_chunk();
        b.id = "chunk_0000000000000002".into();
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn embeddings_valid_rejects_wrong_dimension() {
        let mut chunk = sample_chunk();
        chunk.text_embedding = Some(vec![0.0; 384]);
        assert!(!chunk.embeddings_valid());
        chunk.text_embedding = Some(vec![0.0; 768]);
        assert!(chunk.embeddings_valid());
    }

    #[test]
    fn anonymous_detection() {
        let mut chunk = sample_chunk();
        assert!(!chunk.is_anonymous());
        chunk.name = "anonymous_function_1".into();
        assert!(chunk.is_anonymous());
        chunk.name = String::new();
        assert!(chunk.is_anonymous());
    }
}
