use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::MemoryType;
use crate::errors::CoreError;

/// A free-text memory record, served under the same hybrid-search contract
/// as code chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub project_id: Option<String>,
    pub related_chunk_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vec<f32>>,
    pub embedding_model: Option<String>,
}

impl MemoryRecord {
    /// Validate the invariants from the data model: non-empty title bounded
    /// to 200 chars, non-empty content.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.is_empty() {
            return Err(CoreError::Validation("memory title must not be empty".into()));
        }
        if self.title.chars().count() > 200 {
            return Err(CoreError::Validation("memory title exceeds 200 chars".into()));
        }
        if self.content.is_empty() {
            return Err(CoreError::Validation("memory content must not be empty".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryRecord {
        MemoryRecord {
            id: "mem_1".into(),
            title: "design decision".into(),
            content: "use RRF instead of alpha blending".into(),
            memory_type: MemoryType::Decision,
            tags: vec!["search".into()],
            author: None,
            project_id: None,
            related_chunk_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            embedding: None,
            embedding_model: None,
        }
    }

    #[test]
    fn rejects_empty_title() {
        let mut record = sample();
        record.title = String::new();
        assert!(record.validate().is_err());
    }

    #[test]
    fn rejects_oversized_title() {
        let mut record = sample();
        record.title = "x".repeat(201);
        assert!(record.validate().is_err());
    }

    #[test]
    fn rejects_empty_content() {
        let mut record = sample();
        record.content = String::new();
        assert!(record.validate().is_err());
    }

    #[test]
    fn accepts_valid_record() {
        assert!(sample().validate().is_ok());
    }
}
