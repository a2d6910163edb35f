use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::EdgeRelation;

/// A directed edge between two graph nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: String,
    pub repository: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub relation: EdgeRelation,
    pub properties: EdgeProperties,
    pub created_at: DateTime<Utc>,
}

/// Property bag carried by an edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EdgeProperties {
    pub call_name: Option<String>,
    pub source_file: Option<String>,
    pub target_file: Option<String>,
    /// Re-exported symbol name, for `re_exports` edges.
    pub symbol: Option<String>,
    /// Original (pre-rename) symbol name, for renamed re-exports.
    pub original: Option<String>,
}

impl Edge {
    /// Edges with identical source and target are disallowed for trivial
    /// aliases (e.g. `import x as x`).
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source_node_id == self.target_node_id
    }
}
