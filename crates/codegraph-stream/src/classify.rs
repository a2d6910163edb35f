//! Batch failure classification, grounded on
//! `original_source/api/services/batch_indexing_consumer.py`'s
//! `_classify_error` and the (referenced but unbundled) `ErrorHandler`'s
//! `is_retryable`/`should_stop_consumer` policy.

/// The kind of failure a batch dispatch can surface, inferred by matching
/// substrings in the failure's display text — the subprocess boundary
/// means the consumer never gets a typed error back from the worker, only
/// its stderr and exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchErrorKind {
    Timeout,
    Crash,
    Oom,
    DbConnection,
    Critical,
}

impl BatchErrorKind {
    /// Classifies `message` by the same substring priority order as the
    /// original: timeout, then connection/database, then memory/oom, then
    /// subprocess/process, else critical.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("timeout") {
            Self::Timeout
        } else if lower.contains("connection") || lower.contains("database") {
            Self::DbConnection
        } else if lower.contains("memory") || lower.contains("oom") {
            Self::Oom
        } else if lower.contains("subprocess") || lower.contains("process") {
            Self::Crash
        } else {
            Self::Critical
        }
    }

    /// Whether a batch that failed this way should be left pending for
    /// another reclaim-and-retry cycle rather than acked as a permanent
    /// failure.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::Critical)
    }

    /// Whether this failure should stop the consumer loop entirely rather
    /// than continuing to the next batch.
    #[must_use]
    pub const fn should_stop_consumer(self) -> bool {
        matches!(self, Self::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_timeout_before_other_substrings() {
        assert_eq!(BatchErrorKind::classify("subprocess timeout after 300s"), BatchErrorKind::Timeout);
    }

    #[test]
    fn classifies_connection_and_database_as_db_connection() {
        assert_eq!(BatchErrorKind::classify("connection refused"), BatchErrorKind::DbConnection);
        assert_eq!(BatchErrorKind::classify("database is locked"), BatchErrorKind::DbConnection);
    }

    #[test]
    fn classifies_memory_and_oom() {
        assert_eq!(BatchErrorKind::classify("out of memory"), BatchErrorKind::Oom);
        assert_eq!(BatchErrorKind::classify("oom-killed"), BatchErrorKind::Oom);
    }

    #[test]
    fn classifies_subprocess_crash() {
        assert_eq!(BatchErrorKind::classify("subprocess exited with signal 11"), BatchErrorKind::Crash);
    }

    #[test]
    fn unrecognized_message_is_critical_and_stops_the_consumer() {
        let kind = BatchErrorKind::classify("completely unexpected failure");
        assert_eq!(kind, BatchErrorKind::Critical);
        assert!(!kind.is_retryable());
        assert!(kind.should_stop_consumer());
    }

    #[test]
    fn retryable_kinds_do_not_stop_the_consumer() {
        for kind in [BatchErrorKind::Timeout, BatchErrorKind::Crash, BatchErrorKind::Oom, BatchErrorKind::DbConnection] {
            assert!(kind.is_retryable());
            assert!(!kind.should_stop_consumer());
        }
    }
}
