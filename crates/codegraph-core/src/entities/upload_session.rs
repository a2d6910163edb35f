use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::UploadStatus;

/// Progress tracker for one batch indexing request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadSession {
    pub id: String,
    pub repository: String,
    pub total_files: u32,
    pub counters: StageCounters,
    pub current_file: Option<String>,
    pub errors: Vec<String>,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-stage progress counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StageCounters {
    pub parsed: u32,
    pub chunked: u32,
    pub embedded: u32,
    pub stored: u32,
    pub graphed: u32,
}

impl UploadSession {
    /// Recompute `status` from current counters and error state. Called by
    /// the orchestrator after every file completes.
    pub fn refresh_status(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        let done = self.counters.stored >= self.total_files && self.total_files > 0;
        self.status = if done && self.errors.is_empty() {
            UploadStatus::Completed
        } else if done {
            UploadStatus::Partial
        } else if self.counters.parsed == 0 {
            UploadStatus::Initializing
        } else {
            UploadStatus::Processing
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UploadSession {
        UploadSession {
            id: "upload_1".into(),
            repository: "repo".into(),
            total_files: 2,
            counters: StageCounters::default(),
            current_file: None,
            errors: vec![],
            status: UploadStatus::Initializing,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn transitions_to_completed_when_all_stored_without_errors() {
        let mut session = sample();
        session.counters.parsed = 2;
        session.counters.stored = 2;
        session.refresh_status();
        assert_eq!(session.status, UploadStatus::Completed);
    }

    #[test]
    fn transitions_to_partial_when_done_with_errors() {
        let mut session = sample();
        session.counters.parsed = 2;
        session.counters.stored = 2;
        session.errors.push("boom".into());
        session.refresh_status();
        assert_eq!(session.status, UploadStatus::Partial);
    }

    #[test]
    fn stays_processing_mid_run() {
        let mut session = sample();
        session.counters.parsed = 1;
        session.refresh_status();
        assert_eq!(session.status, UploadStatus::Processing);
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut session = sample();
        session.status = UploadStatus::Error;
        session.refresh_status();
        assert_eq!(session.status, UploadStatus::Error);
    }
}
