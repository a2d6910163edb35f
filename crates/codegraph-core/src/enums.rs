//! Kind and status enums shared across the data model.
//!
//! All enums serialize `snake_case`, matching the convention used
//! throughout the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The structural kind of a chunk produced by the AST chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Function,
    Class,
    Method,
    ArrowFunction,
    Generator,
    Interface,
    TypeAlias,
    Enum,
    Trait,
    Namespace,
    VueSection,
    Barrel,
    ConfigModule,
    FallbackFixed,
}

impl ChunkKind {
    /// Chunk kinds that are eligible to become a graph node. Anonymous-name
    /// chunks of these kinds are still skipped at the construction stage.
    #[must_use]
    pub const fn is_graph_eligible(self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Class | Self::Barrel | Self::ConfigModule)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::ArrowFunction => "arrow_function",
            Self::Generator => "generator",
            Self::Interface => "interface",
            Self::TypeAlias => "type_alias",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Namespace => "namespace",
            Self::VueSection => "vue_section",
            Self::Barrel => "barrel",
            Self::ConfigModule => "config_module",
            Self::FallbackFixed => "fallback_fixed",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a node in the code graph. Mirrors `ChunkKind` for the
/// graph-eligible variants plus an `External` kind for unresolved targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    Method,
    Class,
    Barrel,
    ConfigModule,
    External,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Barrel => "barrel",
            Self::ConfigModule => "config_module",
            Self::External => "external",
        };
        f.write_str(s)
    }
}

impl From<ChunkKind> for Option<NodeKind> {
    fn from(kind: ChunkKind) -> Self {
        match kind {
            ChunkKind::Function => Some(NodeKind::Function),
            ChunkKind::Method => Some(NodeKind::Method),
            ChunkKind::Class => Some(NodeKind::Class),
            ChunkKind::Barrel => Some(NodeKind::Barrel),
            ChunkKind::ConfigModule => Some(NodeKind::ConfigModule),
            ChunkKind::ArrowFunction
            | ChunkKind::Generator
            | ChunkKind::Interface
            | ChunkKind::TypeAlias
            | ChunkKind::Enum
            | ChunkKind::Trait
            | ChunkKind::Namespace
            | ChunkKind::VueSection
            | ChunkKind::FallbackFixed => None,
        }
    }
}

/// The relation an edge expresses between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRelation {
    Calls,
    Imports,
    ReExports,
    Extends,
    Implements,
}

impl fmt::Display for EdgeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Calls => "calls",
            Self::Imports => "imports",
            Self::ReExports => "re_exports",
            Self::Extends => "extends",
            Self::Implements => "implements",
        };
        f.write_str(s)
    }
}

/// Direction filter for graph traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

/// The kind of a free-form memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Note,
    Decision,
    Conversation,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Note => "note",
            Self::Decision => "decision",
            Self::Conversation => "conversation",
        };
        f.write_str(s)
    }
}

/// Lifecycle status of a batch upload/indexing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Initializing,
    Processing,
    Completed,
    Partial,
    Error,
}

impl UploadStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Partial | Self::Error)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// The embedding domain a vector was produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingDomain {
    Text,
    Code,
    Hybrid,
}

impl fmt::Display for EmbeddingDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_eligible_kinds() {
        assert!(ChunkKind::Function.is_graph_eligible());
        assert!(ChunkKind::Barrel.is_graph_eligible());
        assert!(!ChunkKind::Interface.is_graph_eligible());
        assert!(!ChunkKind::FallbackFixed.is_graph_eligible());
    }

    #[test]
    fn upload_status_terminal() {
        assert!(UploadStatus::Completed.is_terminal());
        assert!(UploadStatus::Error.is_terminal());
        assert!(!UploadStatus::Processing.is_terminal());
    }

    #[test]
    fn chunk_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ChunkKind::ConfigModule).unwrap(),
            "\"config_module\""
        );
    }
}
