//! Graph node persistence.

use codegraph_core::entities::NodeProperties;
use codegraph_core::{Node, NodeKind};
use libsql::params;

use crate::db::CodegraphDb;
use crate::error::DatabaseError;
use crate::helpers::{parse_datetime, to_json};

pub struct NodeRepo<'a> {
    db: &'a CodegraphDb,
}

impl<'a> NodeRepo<'a> {
    #[must_use]
    pub fn new(db: &'a CodegraphDb) -> Self {
        Self { db }
    }

    /// # Errors
    /// Returns [`DatabaseError`] on a query or serialization failure.
    pub async fn insert(&self, node: &Node) -> Result<(), DatabaseError> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO nodes (id, repository, kind, label, qualified_name, properties_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                label = excluded.label,
                qualified_name = excluded.qualified_name,
                properties_json = excluded.properties_json",
            params![
                node.id.clone(),
                node.repository.clone(),
                node.kind.to_string(),
                node.label.clone(),
                node.qualified_name.clone(),
                to_json(&node.properties)?,
                node.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    /// # Errors
    /// Returns [`DatabaseError::NotFound`] if no node has `id`.
    pub async fn get(&self, id: &str) -> Result<Node, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn.query("SELECT * FROM nodes WHERE id = ?", params![id]).await?;
        let Some(row) = rows.next().await? else {
            return Err(DatabaseError::NotFound(format!("node {id}")));
        };
        row_to_node(&row)
    }

    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn list_by_repository(&self, repository: &str) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connection();
        let mut rows = conn.query("SELECT * FROM nodes WHERE repository = ?", params![repository]).await?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(row_to_node(&row)?);
        }
        Ok(nodes)
    }

    /// Fetches many nodes by id in one query, preserving no particular
    /// order — used by traversal's "single follow-up query" step
    /// fan-out.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<Node>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.db.connection();
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT * FROM nodes WHERE id IN ({placeholders})");
        let values: Vec<libsql::Value> = ids.iter().map(|id| libsql::Value::Text(id.clone())).collect();
        let mut rows = conn.query(&sql, values).await?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(row_to_node(&row)?);
        }
        Ok(nodes)
    }

    /// Deletes every node owned by `repository` — a repository's nodes are
    /// destroyed wholesale on re-indexing.
    ///
    /// # Errors
    /// Returns [`DatabaseError`] on a query failure.
    pub async fn delete_by_repository(&self, repository: &str) -> Result<u64, DatabaseError> {
        let conn = self.db.connection();
        let affected = conn.execute("DELETE FROM nodes WHERE repository = ?", params![repository]).await?;
        Ok(affected)
    }
}

fn row_to_node(row: &libsql::Row) -> Result<Node, DatabaseError> {
    let kind_str: String = row.get(2)?;
    let kind = node_kind_from_str(&kind_str)?;
    let properties_json: String = row.get(5)?;
    let properties: NodeProperties = crate::helpers::from_json(&properties_json)?;
    let created_at: String = row.get(6)?;

    Ok(Node {
        id: row.get(0)?,
        repository: row.get(1)?,
        kind,
        label: row.get(3)?,
        qualified_name: row.get(4)?,
        properties,
        created_at: parse_datetime(&created_at)?,
    })
}

fn node_kind_from_str(s: &str) -> Result<NodeKind, DatabaseError> {
    match s {
        "function" => Ok(NodeKind::Function),
        "method" => Ok(NodeKind::Method),
        "class" => Ok(NodeKind::Class),
        "barrel" => Ok(NodeKind::Barrel),
        "config_module" => Ok(NodeKind::ConfigModule),
        "external" => Ok(NodeKind::External),
        other => Err(DatabaseError::Query(format!("unknown node kind '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            repository: "repo".into(),
            kind: NodeKind::Function,
            label: "save".into(),
            qualified_name: "api.services.user_service.User.save".into(),
            properties: NodeProperties {
                chunk_id: "chunk_1".into(),
                file_path: "api/services/user_service.py".into(),
                language: "python".into(),
                signature: None,
                complexity: None,
                is_barrel: false,
                start_line: 10,
                end_line: 11,
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = NodeRepo::new(&db);
        repo.insert(&sample_node("node_1")).await.unwrap();
        let fetched = repo.get("node_1").await.unwrap();
        assert_eq!(fetched.label, "save");
    }

    #[tokio::test]
    async fn get_many_returns_only_requested_ids() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = NodeRepo::new(&db);
        repo.insert(&sample_node("node_1")).await.unwrap();
        repo.insert(&sample_node("node_2")).await.unwrap();

        let nodes = repo.get_many(&["node_1".to_string()]).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "node_1");
    }

    #[tokio::test]
    async fn delete_by_repository_removes_all_rows() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let repo = NodeRepo::new(&db);
        repo.insert(&sample_node("node_1")).await.unwrap();
        let deleted = repo.delete_by_repository("repo").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(repo.get("node_1").await.is_err());
    }
}
