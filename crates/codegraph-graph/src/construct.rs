//! Graph construction: load chunks, create nodes, resolve calls/imports,
//! link barrel re-exports, grounded on
//! `original_source/api/services/graph_construction_service.py`.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use codegraph_core::entities::{EdgeProperties, NodeProperties};
use codegraph_core::enums::{ChunkKind, EdgeRelation, NodeKind};
use codegraph_core::{ids, Chunk, Edge, Node};
use codegraph_db::{ChunkRepo, CodegraphDb, EdgeRepo, NodeRepo};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::builtins::is_builtin;
use crate::error::GraphError;
use crate::resolve::CallIndex;

/// Summary returned by [`build`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphStats {
    pub repository: String,
    pub total_nodes: u64,
    pub total_edges: u64,
    pub nodes_by_type: HashMap<String, u64>,
    pub edges_by_type: HashMap<String, u64>,
    pub construction_time_seconds: f64,
    /// `(resolved calls) / (non-builtin calls)`; `1.0` when the repository
    /// has no non-builtin calls at all (vacuously accurate).
    pub resolution_accuracy: f64,
}

/// Rebuilds the entire node/edge graph for `repository` from its stored
/// chunks. Idempotent: any nodes/edges from a previous construction are
/// deleted first, so re-running after a re-index never leaves stale edges
/// pointing at replaced chunks.
///
/// # Errors
/// Returns [`GraphError::Database`] on any repository query/write failure.
pub async fn build(db: &CodegraphDb, repository: &str) -> Result<GraphStats, GraphError> {
    let started = Instant::now();
    let chunk_repo = ChunkRepo::new(db);
    let node_repo = NodeRepo::new(db);
    let edge_repo = EdgeRepo::new(db);

    node_repo.delete_by_repository(repository).await?;
    edge_repo.delete_by_repository(repository).await?;

    let all_chunks = chunk_repo.list_by_repository(repository).await?;
    let eligible: Vec<Chunk> = all_chunks.into_iter().filter(|c| c.kind.is_graph_eligible() && !c.is_anonymous()).collect();

    let mut node_ids: Vec<String> = Vec::with_capacity(eligible.len());
    let mut nodes_by_type: HashMap<String, u64> = HashMap::new();

    for chunk in &eligible {
        let Some(kind): Option<NodeKind> = chunk.kind.into() else {
            continue;
        };
        let node = Node {
            id: ids::new_id(ids::NODE),
            repository: repository.to_string(),
            kind,
            label: chunk.name.clone(),
            qualified_name: chunk.qualified_name.clone().unwrap_or_else(|| chunk.name.clone()),
            properties: NodeProperties {
                chunk_id: chunk.id.clone(),
                file_path: chunk.file_path.clone(),
                language: chunk.language.clone(),
                signature: chunk.metadata.type_signature.clone(),
                complexity: representative_complexity(chunk),
                is_barrel: chunk.kind == ChunkKind::Barrel,
                start_line: chunk.start_line,
                end_line: chunk.end_line,
            },
            created_at: Utc::now(),
        };
        node_repo.insert(&node).await?;
        *nodes_by_type.entry(kind.to_string()).or_insert(0) += 1;
        node_ids.push(node.id);
    }

    let index = CallIndex::build(&eligible);
    let mut total_edges: u64 = 0;
    let mut edges_by_type: HashMap<String, u64> = HashMap::new();
    let mut resolved_calls: u64 = 0;
    let mut non_builtin_calls: u64 = 0;

    for (i, chunk) in eligible.iter().enumerate() {
        let source_node = &node_ids[i];

        for call_name in &chunk.metadata.calls {
            if is_builtin(&chunk.language, call_name) {
                continue;
            }
            non_builtin_calls += 1;
            if let Some(target_idx) = index.resolve_call(chunk, call_name) {
                resolved_calls += 1;
                let edge = Edge {
                    id: ids::new_id(ids::EDGE),
                    repository: repository.to_string(),
                    source_node_id: source_node.clone(),
                    target_node_id: node_ids[target_idx].clone(),
                    relation: EdgeRelation::Calls,
                    properties: EdgeProperties {
                        call_name: Some(call_name.clone()),
                        source_file: Some(chunk.file_path.clone()),
                        target_file: Some(index.chunk(target_idx).file_path.clone()),
                        ..EdgeProperties::default()
                    },
                    created_at: Utc::now(),
                };
                edge_repo.insert(&edge).await?;
                total_edges += 1;
                *edges_by_type.entry(EdgeRelation::Calls.to_string()).or_insert(0) += 1;
            }
        }

        // Import edges: resolved in the same pass per this repo's Open
        // Question resolution (see DESIGN.md), not deferred to later work.
        for import_entry in &chunk.metadata.imports {
            if let Some(target_idx) = index.resolve_import(chunk, import_entry) {
                let edge = Edge {
                    id: ids::new_id(ids::EDGE),
                    repository: repository.to_string(),
                    source_node_id: source_node.clone(),
                    target_node_id: node_ids[target_idx].clone(),
                    relation: EdgeRelation::Imports,
                    properties: EdgeProperties {
                        source_file: Some(chunk.file_path.clone()),
                        target_file: Some(index.chunk(target_idx).file_path.clone()),
                        ..EdgeProperties::default()
                    },
                    created_at: Utc::now(),
                };
                if !edge.is_self_loop() {
                    edge_repo.insert(&edge).await?;
                    total_edges += 1;
                    *edges_by_type.entry(EdgeRelation::Imports.to_string()).or_insert(0) += 1;
                }
            }
        }

        if chunk.kind == ChunkKind::Barrel {
            for re_export in &chunk.metadata.re_exports {
                let Some(target_idx) = resolve_re_export(&eligible, chunk, re_export) else {
                    continue;
                };
                let edge = Edge {
                    id: ids::new_id(ids::EDGE),
                    repository: repository.to_string(),
                    source_node_id: source_node.clone(),
                    target_node_id: node_ids[target_idx].clone(),
                    relation: EdgeRelation::ReExports,
                    properties: EdgeProperties {
                        symbol: Some(re_export.symbol.clone()),
                        original: re_export.original.clone(),
                        source_file: Some(chunk.file_path.clone()),
                        target_file: Some(eligible[target_idx].file_path.clone()),
                        ..EdgeProperties::default()
                    },
                    created_at: Utc::now(),
                };
                if !edge.is_self_loop() {
                    edge_repo.insert(&edge).await?;
                    total_edges += 1;
                    *edges_by_type.entry(EdgeRelation::ReExports.to_string()).or_insert(0) += 1;
                }
            }
        }
    }

    let stats = GraphStats {
        repository: repository.to_string(),
        total_nodes: node_ids.len() as u64,
        total_edges,
        nodes_by_type,
        edges_by_type,
        construction_time_seconds: started.elapsed().as_secs_f64(),
        resolution_accuracy: if non_builtin_calls == 0 { 1.0 } else { resolved_calls as f64 / non_builtin_calls as f64 },
    };
    info!(repository, total_nodes = stats.total_nodes, total_edges = stats.total_edges, accuracy = stats.resolution_accuracy, "graph construction complete");
    Ok(stats)
}

fn representative_complexity(chunk: &Chunk) -> Option<u32> {
    chunk.metadata.complexity.get("cyclomatic").copied().or_else(|| chunk.metadata.complexity.values().copied().max())
}

/// Resolves a barrel's re-export `{symbol, source}` to the eligible chunk
/// it names, by normalizing `source` (a relative import path) against the
/// barrel's own file path and matching on the (possibly renamed) symbol.
fn resolve_re_export(eligible: &[Chunk], barrel: &Chunk, re_export: &codegraph_core::entities::ReExport) -> Option<usize> {
    let effective_symbol = re_export.original.as_deref().unwrap_or(&re_export.symbol);
    if effective_symbol == "*" {
        return None;
    }
    let resolved_stem = resolve_relative_path(&barrel.file_path, &re_export.source);

    eligible.iter().position(|c| c.name == effective_symbol && file_path_matches(&c.file_path, &resolved_stem))
}

fn resolve_relative_path(from_file: &str, source: &str) -> String {
    let mut dir_parts: Vec<&str> = from_file.split('/').collect();
    dir_parts.pop();

    let mut source_parts: Vec<&str> = source.split('/').collect();
    let mut i = 0;
    while i < source_parts.len() {
        match source_parts[i] {
            "." => {
                source_parts.remove(i);
            }
            ".." => {
                dir_parts.pop();
                source_parts.remove(i);
            }
            _ => i += 1,
        }
    }

    dir_parts.into_iter().chain(source_parts).collect::<Vec<_>>().join("/")
}

fn file_path_matches(candidate_file_path: &str, resolved_stem: &str) -> bool {
    let candidate_stem = candidate_file_path.rsplit_once('.').map_or(candidate_file_path, |(stem, _)| stem);
    candidate_stem == resolved_stem || candidate_stem == format!("{resolved_stem}/index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::entities::ChunkMetadata;

    fn make_chunk(id: &str, file: &str, kind: ChunkKind, name: &str, qualified: Option<&str>, calls: Vec<String>) -> Chunk {
        Chunk {
            id: id.into(),
            repository: "repo".into(),
            file_path: file.into(),
            language: "python".into(),
            kind,
            name: name.into(),
            qualified_name: qualified.map(String::from),
            source_text: String::new(),
            start_line: 1,
            end_line: 2,
            commit_id: None,
            metadata: ChunkMetadata { calls, ..ChunkMetadata::default() },
            text_embedding: None,
            code_embedding: None,
            indexed_at: Utc::now(),
            last_modified_at: None,
            node_id: None,
        }
    }

    #[tokio::test]
    async fn builds_nodes_and_call_edges() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let chunk_repo = ChunkRepo::new(&db);
        chunk_repo
            .upsert(&make_chunk("c1", "a.py", ChunkKind::Function, "caller", Some("a.caller"), vec!["callee".to_string()]))
            .await
            .unwrap();
        chunk_repo
            .upsert(&make_chunk("c2", "a.py", ChunkKind::Function, "callee", Some("a.callee"), vec![]))
            .await
            .unwrap();

        let stats = build(&db, "repo").await.unwrap();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.total_edges, 1);
        assert!((stats.resolution_accuracy - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn anonymous_chunks_are_skipped() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let chunk_repo = ChunkRepo::new(&db);
        chunk_repo
            .upsert(&make_chunk("c1", "a.ts", ChunkKind::ArrowFunction, "anonymous_arrow_function", None, vec![]))
            .await
            .unwrap();

        let stats = build(&db, "repo").await.unwrap();
        assert_eq!(stats.total_nodes, 0);
    }

    #[tokio::test]
    async fn unresolvable_calls_lower_accuracy() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let chunk_repo = ChunkRepo::new(&db);
        chunk_repo
            .upsert(&make_chunk("c1", "a.py", ChunkKind::Function, "caller", Some("a.caller"), vec!["missing_fn".to_string()]))
            .await
            .unwrap();

        let stats = build(&db, "repo").await.unwrap();
        assert_eq!(stats.total_edges, 0);
        assert!((stats.resolution_accuracy - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let chunk_repo = ChunkRepo::new(&db);
        chunk_repo
            .upsert(&make_chunk("c1", "a.py", ChunkKind::Function, "caller", Some("a.caller"), vec!["callee".to_string()]))
            .await
            .unwrap();
        chunk_repo
            .upsert(&make_chunk("c2", "a.py", ChunkKind::Function, "callee", Some("a.callee"), vec![]))
            .await
            .unwrap();

        build(&db, "repo").await.unwrap();
        let stats = build(&db, "repo").await.unwrap();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.total_edges, 1);
    }

    #[test]
    fn relative_path_resolution_handles_parent_segment() {
        assert_eq!(resolve_relative_path("packages/shared/src/index.ts", "./a"), "packages/shared/src/a");
        assert_eq!(resolve_relative_path("packages/shared/src/sub/index.ts", "../a"), "packages/shared/src/a");
    }

    #[test]
    fn file_path_matching_accepts_index_barrels() {
        assert!(file_path_matches("packages/shared/src/a.ts", "packages/shared/src/a"));
        assert!(file_path_matches("packages/shared/src/a/index.ts", "packages/shared/src/a"));
        assert!(!file_path_matches("packages/shared/src/b.ts", "packages/shared/src/a"));
    }
}
