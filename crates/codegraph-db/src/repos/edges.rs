//! Graph edge persistence.

use std::collections::HashMap;

use codegraph_core::entities::EdgeProperties;
use codegraph_core::{Edge, EdgeRelation};
use libsql::params;

use crate::db::CodegraphDb;
use crate::error::DatabaseError;
use crate::helpers::{parse_datetime, to_json};

pub struct EdgeRepo<'a> {
    db: &'a CodegraphDb,
}

impl<'a> EdgeRepo<'a> {
    #[must_use]
    pub fn new(db: &'a CodegraphDb) -> Self {
        Self { db }
    }

    /// # Errors
    /// Returns [`DatabaseError`] on a query or serialization failure.
    pub async fn insert(&self, edge: &Edge) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO edges (id, repository, source_node_id, target_node_id, relation, properties_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
            params![
                edge.id.clone(),
                edge.repository.clone(),
                edge.source_node_id.clone(),
                edge.target_node_id.clone(),
                edge.relation.to_string(),
                to_json(&edge.properties)?,
                edge.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn list_by_repository(&self, repository: &str) -> Result<Vec<Edge>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn.query("SELECT * FROM edges WHERE repository = ?", params![repository]).await?;
        let mut edges = Vec::new();
        while let Some(row) = rows.next().await? {
            edges.push(row_to_edge(&row)?);
        }
        Ok(edges)
    }

    /// `{relation kind -> count}` for a repository's edges, feeding the
    /// graph-construction statistics.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn counts_by_relation(&self, repository: &str) -> Result<HashMap<String, u64>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn
            .query(
                "SELECT relation, count(*) FROM edges WHERE repository = ? GROUP BY relation",
                params![repository],
            )
            .await?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next().await? {
            let relation: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            counts.insert(relation, count as u64);
        }
        Ok(counts)
    }

    /// Deletes every edge owned by `repository`.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn delete_by_repository(&self, repository: &str) -> Result<u64, DatabaseError> {
        let conn = self.db.connection();
        let affected = conn.execute("DELETE FROM edges WHERE repository = ?", params![repository]).await?;
        Ok(affected)
    }

    /// Edges with `source_node_id`/`target_node_id` matching `node_ids`
    /// filtered by `relation` and `direction` — the single-hop step of
    /// the recursive traversal CTE, exposed here for
    /// tests; `codegraph-graph` issues the real multi-hop CTE directly
    /// against [`CodegraphDb::connection`].
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn outbound_from(&self, node_id: &str, relation: Option<EdgeRelation>) -> Result<Vec<Edge>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = match relation {
            Some(rel) => {
                conn.query(
                    "SELECT * FROM edges WHERE source_node_id = ? AND relation = ?",
                    params![node_id, rel.to_string()],
                )
                .await?
            }
            None => conn.query("SELECT * FROM edges WHERE source_node_id = ?", params![node_id]).await?,
        };
        let mut edges = Vec::new();
        while let Some(row) = rows.next().await? {
            edges.push(row_to_edge(&row)?);
        }
        Ok(edges)
    }
}

fn row_to_edge(row: &libsql::Row) -> Result<Edge, DatabaseError> {
    let relation_str: String = row.get(4)?;
    let relation = edge_relation_from_str(&relation_str)?;
    let properties_json: String = row.get(5)?;
    let properties: EdgeProperties = crate::helpers::from_json(&properties_json)?;
    let created_at: String = row.get(6)?;

    Ok(Edge {
        id: row.get(0)?,
        repository: row.get(1)?,
        source_node_id: row.get(2)?,
        target_node_id: row.get(3)?,
        relation,
        properties,
        created_at: parse_datetime(&created_at)?,
    })
}

fn edge_relation_from_str(s: &str) -> Result<EdgeRelation, DatabaseError> {
    match s {
        "calls" => Ok(EdgeRelation::Calls),
        "imports" => Ok(EdgeRelation::Imports),
        "re_exports" => Ok(EdgeRelation::ReExports),
        "extends" => Ok(EdgeRelation::Extends),
        "implements" => Ok(EdgeRelation::Implements),
        other => Err(DatabaseError::Query(format!("unknown edge relation '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_edge(id: &str, source: &str, target: &str) -> Edge {
        Edge {
            id: id.to_string(),
            repository: "repo".into(),
            source_node_id: source.into(),
            target_node_id: target.into(),
            relation: EdgeRelation::Calls,
            properties: EdgeProperties { call_name: Some("save".into()), ..Default::default() },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_list_roundtrips() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = EdgeRepo::new(&db);
        repo.insert(&sample_edge("edge_1", "node_1", "node_2")).await.unwrap();
        let edges = repo.list_by_repository("repo").await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relation, EdgeRelation::Calls);
    }

    #[tokio::test]
    async fn counts_by_relation_groups_correctly() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = EdgeRepo::new(&db);
        repo.insert(&sample_edge("edge_1", "node_1", "node_2")).await.unwrap();
        repo.insert(&sample_edge("edge_2", "node_1", "node_3")).await.unwrap();

        let counts = repo.counts_by_relation("repo").await.unwrap();
        assert_eq!(counts.get("calls"), Some(&2));
    }

    #[tokio::test]
    async fn outbound_from_filters_by_relation() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = EdgeRepo::new(&db);
        repo.insert(&sample_edge("edge_1", "node_1", "node_2")).await.unwrap();

        let matching = repo.outbound_from("node_1", Some(EdgeRelation::Calls)).await.unwrap();
        assert_eq!(matching.len(), 1);
        let none = repo.outbound_from("node_1", Some(EdgeRelation::Imports)).await.unwrap();
        assert!(none.is_empty());
    }
}
