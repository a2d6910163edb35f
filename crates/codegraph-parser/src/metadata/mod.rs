//! Per-language metadata extractor contract.
//!
//! Each language implements `extract_imports`/`extract_calls` over the
//! *whole-file* tree and source buffer — never a re-parsed sub-slice — to
//! preserve the byte-offset invariant: truncating the source before
//! extraction corrupts identifiers (`createSuccess` becomes `teSuccess`).

pub mod python;
pub mod typescript;

use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::AstGrep;
use ast_grep_language::SupportLang;
use codegraph_core::entities::ReExport;

/// The full-file AST tree type every extractor operates against.
pub type Tree = AstGrep<StrDoc<SupportLang>>;

/// Metadata recovered from a whole file, keyed by language.
#[derive(Debug, Clone, Default)]
pub struct ExtractedMetadata {
    pub imports: Vec<String>,
    pub re_exports: Vec<ReExport>,
}

/// Per-language metadata extraction. Implemented by `python` and
/// `typescript`; the dispatcher in `chunker` picks the implementation by
/// `ChunkLanguage`.
pub trait LanguageExtractor {
    /// Imports (and, for the TS family, re-exports) extracted once from the
    /// whole-file tree.
    fn extract_file_metadata(&self, tree: &Tree, source: &str) -> ExtractedMetadata;

    /// Calls made within `node`'s subtree (a chunk's own AST node).
    fn extract_calls(&self, node: &ast_grep_core::Node<StrDoc<SupportLang>>, source: &str) -> Vec<String>;
}
