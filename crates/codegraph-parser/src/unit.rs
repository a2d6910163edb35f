//! Intermediate representation between an AST node and a `Chunk`.
//!
//! Mirrors the `CodeUnit` model from
//! `api/models/code_chunk_models.py`: a flat record with its own children
//! (methods of a class) so `chunker::split_and_merge` can decide whether to
//! emit one chunk per unit or split by child.

use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::Node;
use ast_grep_language::SupportLang;
use codegraph_core::enums::ChunkKind;

/// A candidate chunk before size-based split/merge decisions are applied.
///
/// Carries the originating AST node (not just its text) so metadata
/// extraction can walk the node's own subtree directly, rather than
/// re-parsing a sliced source string — the latter is exactly the mistake
/// that corrupts byte offsets (`createSuccess` -> `teSuccess`).
#[derive(Debug, Clone)]
pub struct CodeUnit {
    pub kind: ChunkKind,
    pub name: String,
    pub source: String,
    pub start_line: u32,
    pub end_line: u32,
    pub node: Node<StrDoc<SupportLang>>,
    pub children: Vec<CodeUnit>,
}

impl CodeUnit {
    #[must_use]
    pub fn size(&self) -> usize {
        self.source.len()
    }
}
