//! Barrel and config chunk construction — single-chunk whole-file
//! representations, grounded on `CodeChunkingService._chunk_barrel_file`
//! and `._chunk_config_file`.

use chrono::Utc;
use codegraph_core::entities::ChunkMetadata;
use codegraph_core::enums::ChunkKind;
use codegraph_core::{ids, Chunk};

use crate::classify::{barrel_module_name, config_module_name};
use crate::metadata::ExtractedMetadata;

/// A single `Barrel` chunk spanning the whole file, carrying every
/// re-export recovered by the file-level metadata extraction pass.
#[must_use]
pub fn build_barrel_chunk(
    source: &str,
    repository: &str,
    file_path: &str,
    language: &str,
    metadata: &ExtractedMetadata,
) -> Chunk {
    let module_name = barrel_module_name(file_path);

    Chunk {
        id: ids::new_id(ids::CHUNK),
        repository: repository.to_string(),
        file_path: file_path.to_string(),
        language: language.to_string(),
        kind: ChunkKind::Barrel,
        name: module_name,
        qualified_name: None,
        source_text: source.to_string(),
        start_line: 1,
        end_line: source.lines().count().max(1) as u32,
        commit_id: None,
        metadata: ChunkMetadata {
            imports: metadata.imports.clone(),
            re_exports: metadata.re_exports.clone(),
            ..ChunkMetadata::default()
        },
        text_embedding: None,
        code_embedding: None,
        indexed_at: Utc::now(),
        last_modified_at: None,
        node_id: None,
    }
}

/// A single `ConfigModule` chunk: light extraction, imports only, no calls
/// or re-exports (configs never participate in the call/re-export graph).
#[must_use]
pub fn build_config_chunk(
    source: &str,
    repository: &str,
    file_path: &str,
    language: &str,
    imports: Vec<String>,
) -> Chunk {
    Chunk {
        id: ids::new_id(ids::CHUNK),
        repository: repository.to_string(),
        file_path: file_path.to_string(),
        language: language.to_string(),
        kind: ChunkKind::ConfigModule,
        name: config_module_name(file_path),
        qualified_name: None,
        source_text: source.to_string(),
        start_line: 1,
        end_line: source.lines().count().max(1) as u32,
        commit_id: None,
        metadata: ChunkMetadata {
            imports,
            ..ChunkMetadata::default()
        },
        text_embedding: None,
        code_embedding: None,
        indexed_at: Utc::now(),
        last_modified_at: None,
        node_id: None,
    }
}
