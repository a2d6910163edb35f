//! Secondary in-memory decision-graph analytics over a repository's nodes
//! and edges: centrality, connected components, toposort, shortest path.
//! Grounded on `zen-search/src/graph.rs`'s `DecisionGraph`; kept as a
//! complement to [`crate::traversal`]'s SQL recursive-CTE traversal, not a
//! replacement for it.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::convert::Infallible;

use codegraph_core::{Edge, Node};
use codegraph_db::{CodegraphDb, EdgeRepo, NodeRepo};
use rustworkx_core::centrality::betweenness_centrality;
use rustworkx_core::connectivity::connected_components;
use rustworkx_core::dictmap::{DictMap, InitWithHasher};
use rustworkx_core::petgraph::algo::toposort;
use rustworkx_core::petgraph::graph::{DiGraph, NodeIndex};
use rustworkx_core::shortest_path::dijkstra;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Aggregate analysis over a repository's decision graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphAnalysis {
    pub node_count: usize,
    pub edge_count: usize,
    pub components: usize,
    pub has_cycles: bool,
    pub topological_order: Option<Vec<String>>,
    pub centrality: Vec<(String, f64)>,
}

/// Directed graph built from a repository's persisted nodes/edges, keyed
/// by node id rather than label (code-graph node ids are already unique).
pub struct DecisionGraph {
    graph: DiGraph<Node, Edge>,
    id_to_index: HashMap<String, NodeIndex>,
}

impl DecisionGraph {
    /// Loads every node and edge owned by `repository` and assembles the
    /// in-memory graph.
    ///
    /// # Errors
    /// Returns [`GraphError::Database`] if either query fails.
    pub async fn load(db: &CodegraphDb, repository: &str) -> Result<Self, GraphError> {
        let nodes = NodeRepo::new(db).list_by_repository(repository).await?;
        let edges = EdgeRepo::new(db).list_by_repository(repository).await?;

        let mut graph = DiGraph::new();
        let mut id_to_index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id.clone();
            let idx = graph.add_node(node);
            id_to_index.insert(id, idx);
        }

        for edge in edges {
            if let (Some(&src), Some(&dst)) = (id_to_index.get(&edge.source_node_id), id_to_index.get(&edge.target_node_id)) {
                graph.add_edge(src, dst, edge);
            }
        }

        Ok(Self { graph, id_to_index })
    }

    /// Topological ordering of node ids, `None` if the graph has a cycle.
    #[must_use]
    pub fn toposort(&self) -> Option<Vec<String>> {
        let sorted = toposort(&self.graph, None).ok()?;
        Some(sorted.into_iter().map(|idx| self.graph[idx].id.clone()).collect())
    }

    /// Betweenness centrality over node ids, ranked descending.
    #[must_use]
    pub fn centrality(&self) -> Vec<(String, f64)> {
        let centralities = betweenness_centrality(&self.graph, false, false, 200);
        let mut values: Vec<(String, f64)> = self
            .graph
            .node_indices()
            .map(|idx| (self.graph[idx].id.clone(), centralities[idx.index()].unwrap_or(0.0)))
            .collect();

        values.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        values
    }

    /// Shortest path between two node ids, unweighted (hop count).
    #[must_use]
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let start = *self.id_to_index.get(from)?;
        let goal = *self.id_to_index.get(to)?;

        let mut paths: DictMap<NodeIndex, Vec<NodeIndex>> = DictMap::with_capacity(16);
        let _distances: DictMap<NodeIndex, usize> =
            dijkstra(&self.graph, start, Some(goal), |_| Ok::<usize, Infallible>(1), Some(&mut paths)).ok()?;

        let nodes = paths.get(&goal)?;
        Some(nodes.iter().map(|idx| self.graph[*idx].id.clone()).collect())
    }

    #[must_use]
    pub fn connected_components(&self) -> usize {
        connected_components(&self.graph).len()
    }

    #[must_use]
    pub fn has_cycles(&self) -> bool {
        toposort(&self.graph, None).is_err()
    }

    /// Aggregate analysis; centrality is skipped above `max_nodes_for_centrality`
    /// (betweenness centrality is cubic in the worst case).
    #[must_use]
    pub fn analyze(&self, max_nodes_for_centrality: usize) -> GraphAnalysis {
        GraphAnalysis {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            components: self.connected_components(),
            has_cycles: self.has_cycles(),
            topological_order: self.toposort(),
            centrality: if self.graph.node_count() <= max_nodes_for_centrality { self.centrality() } else { Vec::new() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use codegraph_core::entities::{EdgeProperties, NodeProperties};
    use codegraph_core::enums::{EdgeRelation, NodeKind};

    fn node(id: &str) -> Node {
        Node {
            id: id.into(),
            repository: "repo".into(),
            kind: NodeKind::Function,
            label: id.into(),
            qualified_name: id.into(),
            properties: NodeProperties::default(),
            created_at: Utc::now(),
        }
    }

    fn edge(id: &str, source: &str, target: &str) -> Edge {
        Edge {
            id: id.into(),
            repository: "repo".into(),
            source_node_id: source.into(),
            target_node_id: target.into(),
            relation: EdgeRelation::Calls,
            properties: EdgeProperties::default(),
            created_at: Utc::now(),
        }
    }

    async fn seed_chain(db: &CodegraphDb) {
        let nodes = NodeRepo::new(db);
        for id in ["n1", "n2", "n3"] {
            nodes.insert(&node(id)).await.unwrap();
        }
        let edges = EdgeRepo::new(db);
        edges.insert(&edge("e1", "n1", "n2")).await.unwrap();
        edges.insert(&edge("e2", "n2", "n3")).await.unwrap();
    }

    #[tokio::test]
    async fn analysis_reports_counts_and_acyclicity() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chain(&db).await;

        let graph = DecisionGraph::load(&db, "repo").await.unwrap();
        let analysis = graph.analyze(1_000);

        assert_eq!(analysis.node_count, 3);
        assert_eq!(analysis.edge_count, 2);
        assert_eq!(analysis.components, 1);
        assert!(!analysis.has_cycles);
        assert_eq!(analysis.topological_order.unwrap(), vec!["n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn shortest_path_returns_expected_chain() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chain(&db).await;

        let graph = DecisionGraph::load(&db, "repo").await.unwrap();
        let path = graph.shortest_path("n1", "n3").unwrap();
        assert_eq!(path, vec!["n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn cycle_detection_disables_toposort() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        let nodes = NodeRepo::new(&db);
        nodes.insert(&node("n1")).await.unwrap();
        nodes.insert(&node("n2")).await.unwrap();
        let edges = EdgeRepo::new(&db);
        edges.insert(&edge("e1", "n1", "n2")).await.unwrap();
        edges.insert(&edge("e2", "n2", "n1")).await.unwrap();

        let graph = DecisionGraph::load(&db, "repo").await.unwrap();
        let analysis = graph.analyze(1_000);
        assert!(analysis.has_cycles);
        assert!(analysis.topological_order.is_none());
    }

    #[tokio::test]
    async fn centrality_skipped_above_node_budget() {
        let db = CodegraphDb::open_in_memory().await.unwrap();
        seed_chain(&db).await;

        let graph = DecisionGraph::load(&db, "repo").await.unwrap();
        let analysis = graph.analyze(1);
        assert!(analysis.centrality.is_empty());
    }
}
