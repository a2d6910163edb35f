//! Recursive-CTE graph traversal and path-finding, grounded on
//! `original_source/api/services/graph_traversal_service.py`.

use codegraph_cache::{keys, L2Cache};
use codegraph_core::enums::EdgeDirection;
use codegraph_core::{EdgeRelation, Node};
use codegraph_db::{CodegraphDb, NodeRepo};
use libsql::params;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

const TRAVERSAL_CACHE_TTL_SECS: u64 = 120;

/// Result of [`traverse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraversalResult {
    pub start_node: String,
    pub direction: EdgeDirection,
    pub relation: Option<EdgeRelation>,
    pub max_depth: u32,
    pub nodes: Vec<Node>,
    pub total_nodes: u64,
}

/// Walks edges from `start_node_id` out to `max_depth` hops, deduplicating
/// discovered node ids and excluding the start node, then fetching the
/// full node rows in one follow-up query.
///
/// # Errors
/// Returns [`GraphError`] on any database or cache-serialization failure.
pub async fn traverse(
    db: &CodegraphDb,
    cache: Option<&L2Cache>,
    start_node_id: &str,
    direction: EdgeDirection,
    relation: Option<EdgeRelation>,
    max_depth: u32,
) -> Result<TraversalResult, GraphError> {
    let direction_label = direction_label(direction);
    let cache_key = keys::graph_traversal(start_node_id, max_depth, relation.map(|r| r.to_string()).as_deref(), direction_label);

    if let Some(cache) = cache {
        if let Some(cached) = cache.get::<TraversalResult>(&cache_key).await {
            return Ok(cached);
        }
    }

    let ids = reachable_node_ids(db, start_node_id, direction, relation, max_depth).await?;
    let node_repo = NodeRepo::new(db);
    let nodes = node_repo.get_many(&ids).await?;

    let result = TraversalResult {
        start_node: start_node_id.to_string(),
        direction,
        relation,
        max_depth,
        total_nodes: nodes.len() as u64,
        nodes,
    };

    if let Some(cache) = cache {
        cache.set(&cache_key, &result, Some(TRAVERSAL_CACHE_TTL_SECS)).await;
    }

    Ok(result)
}

async fn reachable_node_ids(
    db: &CodegraphDb,
    start_node_id: &str,
    direction: EdgeDirection,
    relation: Option<EdgeRelation>,
    max_depth: u32,
) -> Result<Vec<String>, GraphError> {
    match direction {
        EdgeDirection::Outgoing => reachable_one_direction(db, start_node_id, relation, max_depth, true).await,
        EdgeDirection::Incoming => reachable_one_direction(db, start_node_id, relation, max_depth, false).await,
        EdgeDirection::Both => {
            let mut outbound = reachable_one_direction(db, start_node_id, relation, max_depth, true).await?;
            let inbound = reachable_one_direction(db, start_node_id, relation, max_depth, false).await?;
            for id in inbound {
                if !outbound.contains(&id) {
                    outbound.push(id);
                }
            }
            Ok(outbound)
        }
    }
}

async fn reachable_one_direction(
    db: &CodegraphDb,
    start_node_id: &str,
    relation: Option<EdgeRelation>,
    max_depth: u32,
    outbound: bool,
) -> Result<Vec<String>, GraphError> {
    let (from_col, to_col) = if outbound { ("source_node_id", "target_node_id") } else { ("target_node_id", "source_node_id") };

    let sql = match relation {
        Some(_) => format!(
            "WITH RECURSIVE reachable(node_id, depth) AS (
                SELECT {to_col}, 1 FROM edges WHERE {from_col} = ?1 AND relation = ?2
                UNION
                SELECT e.{to_col}, r.depth + 1
                FROM edges e JOIN reachable r ON e.{from_col} = r.node_id
                WHERE r.depth < ?3 AND e.relation = ?2
            )
            SELECT DISTINCT node_id FROM reachable WHERE node_id != ?1"
        ),
        None => format!(
            "WITH RECURSIVE reachable(node_id, depth) AS (
                SELECT {to_col}, 1 FROM edges WHERE {from_col} = ?1
                UNION
                SELECT e.{to_col}, r.depth + 1
                FROM edges e JOIN reachable r ON e.{from_col} = r.node_id
                WHERE r.depth < ?3
            )
            SELECT DISTINCT node_id FROM reachable WHERE node_id != ?1"
        ),
    };

    let conn = db.connection();
    let mut rows = match relation {
        Some(rel) => conn.query(&sql, params![start_node_id, rel.to_string(), max_depth]).await?,
        None => conn.query(&sql, params![start_node_id, max_depth]).await?,
    };

    let mut ids = Vec::new();
    while let Some(row) = rows.next().await? {
        ids.push(row.get::<String>(0)?);
    }
    Ok(ids)
}

/// Finds the shortest outbound path from `source` to `target`, or `None`
/// if no path of at most `max_depth` hops exists.
///
/// # Errors
/// Returns [`GraphError`] on any database or cache-serialization failure.
pub async fn find_path(
    db: &CodegraphDb,
    cache: Option<&L2Cache>,
    source: &str,
    target: &str,
    relation: Option<EdgeRelation>,
    max_depth: u32,
) -> Result<Option<Vec<String>>, GraphError> {
    let cache_key = keys::graph_path(source, target, relation.map(|r| r.to_string()).as_deref(), max_depth);

    if let Some(cache) = cache {
        if let Some(cached) = cache.get::<Option<Vec<String>>>(&cache_key).await {
            return Ok(cached);
        }
    }

    let path = shortest_path(db, source, target, relation, max_depth).await?;

    if let Some(cache) = cache {
        cache.set(&cache_key, &path, Some(TRAVERSAL_CACHE_TTL_SECS)).await;
    }

    Ok(path)
}

async fn shortest_path(
    db: &CodegraphDb,
    source: &str,
    target: &str,
    relation: Option<EdgeRelation>,
    max_depth: u32,
) -> Result<Option<Vec<String>>, GraphError> {
    let sql = match relation {
        Some(_) => {
            "WITH RECURSIVE search_path(node_id, path, depth) AS (
                SELECT target_node_id, ',' || source_node_id || ',' || target_node_id || ',', 1
                FROM edges WHERE source_node_id = ?1 AND relation = ?3
                UNION ALL
                SELECT e.target_node_id, r.path || e.target_node_id || ',', r.depth + 1
                FROM edges e JOIN search_path r ON e.source_node_id = r.node_id
                WHERE r.depth < ?4
                    AND e.relation = ?3
                    AND instr(r.path, ',' || e.target_node_id || ',') = 0
            )
            SELECT path FROM search_path WHERE node_id = ?2 ORDER BY depth LIMIT 1"
        }
        None => {
            "WITH RECURSIVE search_path(node_id, path, depth) AS (
                SELECT target_node_id, ',' || source_node_id || ',' || target_node_id || ',', 1
                FROM edges WHERE source_node_id = ?1
                UNION ALL
                SELECT e.target_node_id, r.path || e.target_node_id || ',', r.depth + 1
                FROM edges e JOIN search_path r ON e.source_node_id = r.node_id
                WHERE r.depth < ?4
                    AND instr(r.path, ',' || e.target_node_id || ',') = 0
            )
            SELECT path FROM search_path WHERE node_id = ?2 ORDER BY depth LIMIT 1"
        }
    };

    let conn = db.connection();
    let mut rows = match relation {
        Some(rel) => conn.query(sql, params![source, target, rel.to_string(), max_depth]).await?,
        None => conn.query(sql, params![source, target, max_depth]).await?,
    };

    let Some(row) = rows.next().await? else {
        return Ok(None);
    };
    let raw_path: String = row.get(0)?;
    let ids: Vec<String> = raw_path.split(',').filter(|s| !s.is_empty()).map(String::from).collect();
    Ok(Some(ids))
}

fn direction_label(direction: EdgeDirection) -> &'static str {
    match direction {
        EdgeDirection::Outgoing => "outbound",
        EdgeDirection::Incoming => "inbound",
        EdgeDirection::Both => "both",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use codegraph_core::entities::EdgeProperties;
    use codegraph_core::Edge;
    use codegraph_db::EdgeRepo;

    fn edge(id: &str, source: &str, target: &str, relation: EdgeRelation) -> Edge {
        Edge {
            id: id.into(),
            repository: "repo".into(),
            source_node_id: source.into(),
            target_node_id: target.into(),
            relation,
            properties: EdgeProperties::default(),
            created_at: Utc::now(),
        }
    }

    async fn seed_chain(db: &CodegraphDb) {
        let repo = EdgeRepo::new(db);
        repo.insert(&edge("e1", "a", "b", EdgeRelation::Calls)).await.unwrap();
        repo.insert(&edge("e2", "b", "c", EdgeRelation::Calls)).await.unwrap();
        repo.insert(&edge("e3", "c", "d", EdgeRelation::Calls)).await.unwrap();
    }

    #[tokio::test]
    async fn traverse_finds_all_nodes_within_depth() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chain(&db).await;
        let ids = reachable_node_ids(&db, "a", EdgeDirection::Outgoing, None, 2).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"b".to_string()));
        assert!(ids.contains(&"c".to_string()));
        assert!(!ids.contains(&"d".to_string()));
    }

    #[tokio::test]
    async fn traverse_excludes_start_node() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = EdgeRepo::new(&db);
        repo.insert(&edge("e1", "a", "a", EdgeRelation::Calls)).await.unwrap();
        let ids = reachable_node_ids(&db, "a", EdgeDirection::Outgoing, None, 3).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn inbound_direction_walks_edges_backward() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chain(&db).await;
        let ids = reachable_node_ids(&db, "c", EdgeDirection::Incoming, None, 5).await.unwrap();
        assert!(ids.contains(&"a".to_string()));
        assert!(ids.contains(&"b".to_string()));
    }

    #[tokio::test]
    async fn relation_filter_excludes_other_relations() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = EdgeRepo::new(&db);
        repo.insert(&edge("e1", "a", "b", EdgeRelation::Imports)).await.unwrap();
        let ids = reachable_node_ids(&db, "a", EdgeDirection::Outgoing, Some(EdgeRelation::Calls), 3).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn find_path_returns_shortest_chain() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chain(&db).await;
        let path = shortest_path(&db, "a", "d", None, 5).await.unwrap().unwrap();
        assert_eq!(path, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn find_path_returns_none_when_unreachable() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chain(&db).await;
        let path = shortest_path(&db, "d", "a", None, 5).await.unwrap();
        assert!(path.is_none());
    }

    #[tokio::test]
    async fn find_path_respects_max_depth() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chain(&db).await;
        let path = shortest_path(&db, "a", "d", None, 1).await.unwrap();
        assert!(path.is_none());
    }
}
