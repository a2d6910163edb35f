//! `codegraph memory`: record and lexically search free-text memories,
//! served under the same data model as indexed code.

use chrono::Utc;
use codegraph_config::CodegraphConfig;
use codegraph_core::enums::MemoryType;
use codegraph_core::{ids, MemoryRecord};
use codegraph_db::{CodegraphDb, MemoryRepo};
use serde::Serialize;

use crate::cli::{MemoryAction, MemoryTypeArg, OutputFormat};
use crate::output;

/// # Errors
/// Returns an error if the relational store cannot be opened, the new
/// record fails validation, or the requested query fails.
pub async fn run(action: MemoryAction, format: OutputFormat) -> anyhow::Result<()> {
    let config = CodegraphConfig::load()?;
    let db = CodegraphDb::open(&config.database.url).await?;
    let repo = MemoryRepo::new(&db);

    match action {
        MemoryAction::Add { title, content, memory_type, project } => {
            let now = Utc::now();
            let record = MemoryRecord {
                id: ids::new_id(ids::MEMORY),
                title,
                content,
                memory_type: to_memory_type(memory_type),
                tags: Vec::new(),
                author: None,
                project_id: project,
                related_chunk_ids: Vec::new(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
                embedding: None,
                embedding_model: None,
            };
            repo.create(&record).await?;
            output::emit(&record, format)
        }
        MemoryAction::Search { query, limit } => {
            let hits = repo.lexical_search(&query, limit).await?;
            let results: Vec<MemoryHit> = hits
                .into_iter()
                .map(|hit| MemoryHit { id: hit.chunk_id, title: hit.name, rank: hit.rank })
                .collect();
            output::emit(&results, format)
        }
    }
}

#[derive(Debug, Serialize)]
struct MemoryHit {
    id: String,
    title: String,
    rank: f64,
}

const fn to_memory_type(value: MemoryTypeArg) -> MemoryType {
    match value {
        MemoryTypeArg::Note => MemoryType::Note,
        MemoryTypeArg::Decision => MemoryType::Decision,
        MemoryTypeArg::Conversation => MemoryType::Conversation,
    }
}
