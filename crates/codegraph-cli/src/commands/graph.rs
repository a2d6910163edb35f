//! `codegraph graph`: (re)build, traverse, or path-find over a
//! repository's call/import/re-export graph.

use codegraph_config::CodegraphConfig;
use codegraph_core::enums::{EdgeDirection, EdgeRelation};
use codegraph_db::CodegraphDb;
use codegraph_graph::DecisionGraph;
use serde::Serialize;

use crate::cli::{GraphAction, OutputFormat, RelationArg, TraverseDirection};
use crate::output;

/// # Errors
/// Returns an error if the relational store cannot be opened or the
/// requested graph operation fails.
pub async fn run(action: GraphAction, format: OutputFormat) -> anyhow::Result<()> {
    let config = CodegraphConfig::load()?;
    let db = CodegraphDb::open(&config.database.url).await?;

    match action {
        GraphAction::Build { repository } => {
            let stats = codegraph_graph::build(&db, &repository).await?;
            output::emit(&stats, format)
        }
        GraphAction::Traverse { node_id, depth, direction, relation } => {
            let result = codegraph_graph::traverse(
                &db,
                None,
                &node_id,
                to_edge_direction(direction),
                relation.map(to_edge_relation),
                depth,
            )
            .await?;
            output::emit(&result, format)
        }
        GraphAction::Path { repository, from, to } => {
            let graph = DecisionGraph::load(&db, &repository).await?;
            let path = graph.shortest_path(&from, &to);
            output::emit(&PathReport { from, to, path }, format)
        }
    }
}

#[derive(Debug, Serialize)]
struct PathReport {
    from: String,
    to: String,
    path: Option<Vec<String>>,
}

const fn to_edge_direction(direction: TraverseDirection) -> EdgeDirection {
    match direction {
        TraverseDirection::Outgoing => EdgeDirection::Outgoing,
        TraverseDirection::Incoming => EdgeDirection::Incoming,
        TraverseDirection::Both => EdgeDirection::Both,
    }
}

const fn to_edge_relation(relation: RelationArg) -> EdgeRelation {
    match relation {
        RelationArg::Calls => EdgeRelation::Calls,
        RelationArg::Imports => EdgeRelation::Imports,
        RelationArg::ReExports => EdgeRelation::ReExports,
        RelationArg::Extends => EdgeRelation::Extends,
        RelationArg::Implements => EdgeRelation::Implements,
    }
}
