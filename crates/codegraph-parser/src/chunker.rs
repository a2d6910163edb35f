//! The cAST split-then-merge chunker entrypoint, grounded on
//! `CodeChunkingService.chunk_code` and its `_extract_code_units` /
//! `_split_and_merge` helpers.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ast_grep_core::matcher::KindMatcher;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::Node;
use ast_grep_language::{LanguageExt, SupportLang};
use chrono::Utc;
use codegraph_core::entities::ChunkMetadata;
use codegraph_core::enums::ChunkKind;
use codegraph_core::{ids, Chunk};

use crate::barrel::{build_barrel_chunk, build_config_chunk};
use crate::classify::{self, FileType};
use crate::error::ParserError;
use crate::fixed_size::chunk_fixed_size;
use crate::language::ChunkLanguage;
use crate::metadata::python::PythonExtractor;
use crate::metadata::typescript::TypeScriptExtractor;
use crate::metadata::{LanguageExtractor, Tree};
use crate::qualified_name::anonymous_name;
use crate::unit::CodeUnit;

/// Parsing a file larger than this is assumed pathological; the thread is
/// abandoned (not joined) and the caller falls back to fixed-size
/// chunking rather than blocking indefinitely.
const PARSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Chunk `source` semantically via AST, dispatching to barrel/config
/// handling, fixed-size fallback, or the full split-then-merge pipeline.
///
/// # Errors
/// Returns [`ParserError::EmptySource`] for blank input. All other
/// failure modes (unsupported language, parse timeout, parse panic)
/// degrade to fixed-size chunking rather than erroring, matching the
/// original service's graceful-degradation policy.
pub fn chunk_code(
    source: &str,
    repository: &str,
    language_tag: &str,
    file_path: &str,
    max_chunk_size: usize,
    min_chunk_size: usize,
) -> Result<Vec<Chunk>, ParserError> {
    if source.trim().is_empty() {
        return Err(ParserError::EmptySource);
    }

    let is_ts_family = matches!(
        language_tag.to_ascii_lowercase().as_str(),
        "typescript" | "javascript" | "tsx"
    );

    if is_ts_family && classify::should_skip_file(file_path) {
        tracing::info!(file_path, "skipping test file");
        return Ok(Vec::new());
    }
    let file_type = if is_ts_family {
        classify::classify_by_filename(file_path)
    } else {
        FileType::Regular
    };

    let Some(language) = ChunkLanguage::from_tag(language_tag) else {
        tracing::warn!(language_tag, "no parser for language, using fixed-size chunking");
        return Ok(chunk_fixed_size(
            source,
            repository,
            file_path,
            language_tag,
            max_chunk_size,
            "unsupported_language",
        ));
    };

    let tree = match parse_with_timeout(source.to_string(), language.support_lang()) {
        Ok(tree) => tree,
        Err(ParserError::ParseTimeout(_)) => {
            tracing::error!(file_path, "tree-sitter parse timed out, falling back to fixed-size chunking");
            return Ok(chunk_fixed_size(source, repository, file_path, language_tag, max_chunk_size, "parse_timeout"));
        }
        Err(_) => {
            tracing::error!(file_path, "ast parsing failed, falling back to fixed-size chunking");
            return Ok(chunk_fixed_size(source, repository, file_path, language_tag, max_chunk_size, "ast_parsing_failed"));
        }
    };

    let extractor: Box<dyn LanguageExtractor> = match language {
        ChunkLanguage::Python => Box::new(PythonExtractor),
        ChunkLanguage::TypeScript | ChunkLanguage::Tsx | ChunkLanguage::JavaScript => {
            Box::new(TypeScriptExtractor { lang: language.support_lang() })
        }
    };

    if file_type == FileType::Config {
        let metadata = extractor.extract_file_metadata(&tree, source);
        return Ok(vec![build_config_chunk(source, repository, file_path, language_tag, metadata.imports)]);
    }

    if file_type == FileType::PotentialBarrel {
        let metadata = extractor.extract_file_metadata(&tree, source);
        if classify::is_barrel_heuristic(source, metadata.re_exports.len()) {
            return Ok(vec![build_barrel_chunk(source, repository, file_path, language_tag, &metadata)]);
        }
    }

    let units = extract_code_units(&tree, language);
    let file_metadata = extractor.extract_file_metadata(&tree, source);
    let chunks = split_and_merge(
        &units,
        repository,
        file_path,
        language_tag,
        max_chunk_size,
        source,
        extractor.as_ref(),
        &file_metadata,
        language.is_ts_family(),
    );

    tracing::info!(file_path, chunk_count = chunks.len(), "chunked via ast");
    Ok(chunks)
}

/// Parses on a dedicated thread so a pathological input can be abandoned
/// on timeout instead of blocking the caller. `codegraph-parser` has no
/// async runtime of its own; the orchestrator crate wraps file-level
/// calls to `chunk_code` in `tokio::task::spawn_blocking`.
fn parse_with_timeout(source: String, lang: SupportLang) -> Result<Tree, ParserError> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let tree = lang.ast_grep(&source);
        let _ = tx.send(tree);
    });

    match rx.recv_timeout(PARSE_TIMEOUT) {
        Ok(tree) => Ok(tree),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ParserError::ParseTimeout(PARSE_TIMEOUT)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ParserError::ParseThreadPanicked),
    }
}

fn extract_code_units(tree: &Tree, language: ChunkLanguage) -> Vec<CodeUnit> {
    match language {
        ChunkLanguage::Python => extract_python_units(tree),
        ChunkLanguage::TypeScript | ChunkLanguage::Tsx | ChunkLanguage::JavaScript => {
            extract_ts_units(tree, language.support_lang(), language == ChunkLanguage::TypeScript || language == ChunkLanguage::Tsx)
        }
    }
}

fn node_name(node: &Node<StrDoc<SupportLang>>, kind: &str, file_path: &str) -> String {
    node.field("name").map_or_else(
        || anonymous_name(kind, file_path, node.start_pos().line() as u32 + 1),
        |n| n.text().to_string(),
    )
}

fn to_unit(node: &Node<StrDoc<SupportLang>>, kind: ChunkKind, file_path: &str, children: Vec<CodeUnit>) -> CodeUnit {
    let name = node_name(node, kind.as_str(), file_path);
    CodeUnit {
        kind,
        name,
        source: node.text().to_string(),
        start_line: node.start_pos().line() as u32 + 1,
        end_line: node.end_pos().line() as u32 + 1,
        node: node.clone(),
        children,
    }
}

fn extract_python_units(tree: &Tree) -> Vec<CodeUnit> {
    let root = tree.root();
    let class_matcher = KindMatcher::new("class_definition", SupportLang::Python);
    let function_matcher = KindMatcher::new("function_definition", SupportLang::Python);

    let mut units = Vec::new();
    let mut method_lines = std::collections::HashSet::new();

    for class_node in root.find_all(&class_matcher) {
        let mut methods = Vec::new();
        if let Some(block) = class_node.children().find(|c| c.kind().as_ref() == "block") {
            for child in block.children() {
                if child.kind().as_ref() == "function_definition" {
                    method_lines.insert(child.start_pos().line());
                    methods.push(to_unit(&child, ChunkKind::Method, "", Vec::new()));
                }
            }
        }
        units.push(to_unit(&class_node, ChunkKind::Class, "", methods));
    }

    for function_node in root.find_all(&function_matcher) {
        if method_lines.contains(&function_node.start_pos().line()) {
            continue;
        }
        units.push(to_unit(&function_node, ChunkKind::Function, "", Vec::new()));
    }

    units.sort_by_key(|u| u.start_line);
    units
}

fn extract_ts_units(tree: &Tree, lang: SupportLang, with_interfaces: bool) -> Vec<CodeUnit> {
    let root = tree.root();
    let function_matcher = KindMatcher::new("function_declaration", lang);
    let class_matcher = KindMatcher::new("class_declaration", lang);
    let variable_declarator_matcher = KindMatcher::new("variable_declarator", lang);

    let mut units = Vec::new();

    for function_node in root.find_all(&function_matcher) {
        units.push(to_unit(&function_node, ChunkKind::Function, "", Vec::new()));
    }

    for declarator in root.find_all(&variable_declarator_matcher) {
        if let Some(value) = declarator.field("value")
            && value.kind().as_ref() == "arrow_function"
        {
            let name = declarator
                .field("name")
                .map_or_else(|| "anonymous_arrow_function".to_string(), |n| n.text().to_string());
            units.push(CodeUnit {
                kind: ChunkKind::ArrowFunction,
                name,
                source: declarator.text().to_string(),
                start_line: declarator.start_pos().line() as u32 + 1,
                end_line: declarator.end_pos().line() as u32 + 1,
                node: declarator.clone(),
                children: Vec::new(),
            });
        }
    }

    for class_node in root.find_all(&class_matcher) {
        let mut methods = Vec::new();
        if let Some(body) = class_node.field("body") {
            for child in body.children() {
                if child.kind().as_ref() == "method_definition" {
                    methods.push(to_unit(&child, ChunkKind::Method, "", Vec::new()));
                }
            }
        }
        units.push(to_unit(&class_node, ChunkKind::Class, "", methods));
    }

    if with_interfaces {
        let interface_matcher = KindMatcher::new("interface_declaration", lang);
        for interface_node in root.find_all(&interface_matcher) {
            units.push(to_unit(&interface_node, ChunkKind::Interface, "", Vec::new()));
        }
    }

    units.sort_by_key(|u| u.start_line);
    units
}

/// Split units too large to chunk whole (by child, i.e. class methods),
/// and hand units still too large after that to fixed-size chunking.
/// Merging adjacent sub-`min_chunk_size` chunks is intentionally not done
/// for AST-derived chunks: unlike the fixed-size fallback, a semantic
/// chunk below `min_chunk_size` (a one-line getter) is still a complete,
/// independently meaningful unit and is kept as-is.
#[allow(clippy::too_many_arguments)]
fn split_and_merge(
    units: &[CodeUnit],
    repository: &str,
    file_path: &str,
    language: &str,
    max_chunk_size: usize,
    source: &str,
    extractor: &dyn LanguageExtractor,
    file_metadata: &crate::metadata::ExtractedMetadata,
    is_ts_family: bool,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for unit in units {
        if unit.size() <= max_chunk_size {
            chunks.push(unit_to_chunk(unit, repository, file_path, language, source, extractor, file_metadata, is_ts_family));
        } else if unit.children.is_empty() {
            tracing::warn!(name = %unit.name, size = unit.size(), "unit too large, using fixed-size chunking");
            chunks.extend(chunk_fixed_size(&unit.source, repository, file_path, language, max_chunk_size, "unit_too_large"));
        } else {
            for child in &unit.children {
                if child.size() <= max_chunk_size {
                    chunks.push(unit_to_chunk(child, repository, file_path, language, source, extractor, file_metadata, is_ts_family));
                } else {
                    tracing::warn!(name = %child.name, size = child.size(), "method too large, using fixed-size chunking");
                    chunks.extend(chunk_fixed_size(&child.source, repository, file_path, language, max_chunk_size, "method_too_large"));
                }
            }
        }
    }

    chunks
}

#[allow(clippy::too_many_arguments)]
fn unit_to_chunk(
    unit: &CodeUnit,
    repository: &str,
    file_path: &str,
    language: &str,
    source: &str,
    extractor: &dyn LanguageExtractor,
    file_metadata: &crate::metadata::ExtractedMetadata,
    is_ts_family: bool,
) -> Chunk {
    let calls = extractor.extract_calls(&unit.node, source);
    let metadata = ChunkMetadata {
        imports: file_metadata.imports.clone(),
        calls,
        re_exports: if is_ts_family { file_metadata.re_exports.clone() } else { Vec::new() },
        ..ChunkMetadata::default()
    };

    Chunk {
        id: ids::new_id(ids::CHUNK),
        repository: repository.to_string(),
        file_path: file_path.to_string(),
        language: language.to_string(),
        kind: unit.kind,
        name: unit.name.clone(),
        qualified_name: None,
        source_text: unit.source.clone(),
        start_line: unit.start_line,
        end_line: unit.end_line,
        commit_id: None,
        metadata,
        text_embedding: None,
        code_embedding: None,
        indexed_at: Utc::now(),
        last_modified_at: None,
        node_id: None,
    }
}
