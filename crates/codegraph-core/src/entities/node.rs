use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::NodeKind;

/// A graph node corresponding to a graph-eligible chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    pub repository: String,
    pub kind: NodeKind,
    pub label: String,
    pub qualified_name: String,
    pub properties: NodeProperties,
    pub created_at: DateTime<Utc>,
}

/// Property bag carried by a node, mirroring its originating chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeProperties {
    pub chunk_id: String,
    pub file_path: String,
    pub language: String,
    pub signature: Option<String>,
    pub complexity: Option<u32>,
    pub is_barrel: bool,
    pub start_line: u32,
    pub end_line: u32,
}
