//! Fixed-size fallback chunking for parse failures/timeouts and for units
//! too large to split further, grounded on
//! `CodeChunkingService._fallback_fixed_chunking`.

use chrono::Utc;
use codegraph_core::entities::ChunkMetadata;
use codegraph_core::enums::ChunkKind;
use codegraph_core::{ids, Chunk};

/// Minimum length (in trimmed characters) a trailing fragment must have to
/// stand as its own chunk; shorter fragments are merged into the previous
/// chunk.
const MIN_TRAILING_CHUNK_LEN: usize = 50;

/// Produce `fallback_fixed` chunks with 10% line overlap. The final short
/// chunk, if any, is merged into the previous one rather than left
/// standalone.
#[must_use]
pub fn chunk_fixed_size(
    source: &str,
    repository: &str,
    file_path: &str,
    language: &str,
    chunk_size: usize,
    reason: &str,
) -> Vec<Chunk> {
    let lines: Vec<&str> = source.split('\n').collect();
    if lines.is_empty() {
        return Vec::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let avg_line_length = source.len() as f64 / lines.len() as f64;
    let avg_line_length = if avg_line_length > 0.0 { avg_line_length } else { 80.0 };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lines_per_chunk = ((chunk_size as f64 / avg_line_length) as usize).max(1);
    let overlap_lines = ((lines_per_chunk as f64 * 0.1) as usize).max(1);

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut i = 0usize;
    let mut chunk_num = 0usize;
    let now = Utc::now();

    while i < lines.len() {
        let end = (i + lines_per_chunk).min(lines.len());
        let chunk_lines = &lines[i..end];
        let chunk_source = chunk_lines.join("\n");

        if chunk_source.trim().len() < MIN_TRAILING_CHUNK_LEN && !chunks.is_empty() {
            if let Some(prev) = chunks.last_mut() {
                prev.source_text.push('\n');
                prev.source_text.push_str(&chunk_source);
                prev.end_line = (i + chunk_lines.len()) as u32;
            }
            break;
        }

        let metadata = ChunkMetadata {
            doc_summary: Some(format!("fallback: {reason}")),
            ..ChunkMetadata::default()
        };

        chunks.push(Chunk {
            id: ids::new_id(ids::CHUNK),
            repository: repository.to_string(),
            file_path: file_path.to_string(),
            language: language.to_string(),
            kind: ChunkKind::FallbackFixed,
            name: format!("chunk_{chunk_num}"),
            qualified_name: None,
            source_text: chunk_source,
            start_line: (i + 1) as u32,
            end_line: (i + chunk_lines.len()) as u32,
            commit_id: None,
            metadata,
            text_embedding: None,
            code_embedding: None,
            indexed_at: now,
            last_modified_at: None,
            node_id: None,
        });

        i += lines_per_chunk.saturating_sub(overlap_lines).max(1);
        chunk_num += 1;
    }

    chunks
}
