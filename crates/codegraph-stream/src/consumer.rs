//! The batch consumer loop: read → dispatch to a subprocess worker →
//! record progress → ack, plus periodic pending-entry reclaim and a
//! completion trigger for graph construction. Grounded on
//! `original_source/api/services/batch_indexing_consumer.py`'s
//! `BatchIndexingConsumer.process_repository`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use codegraph_core::{UploadSession, UploadStatus};
use codegraph_db::{CodegraphDb, UploadSessionRepo};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{info, warn};

use crate::classify::BatchErrorKind;
use crate::error::StreamError;
use crate::stream_client::{StreamClient, StreamEntry};

/// 40 files × ~7.5s/file, matching the original subprocess timeout
/// budget.
const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_PENDING_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_READ_BLOCK: Duration = Duration::from_secs(5);

/// Tunables for [`BatchConsumer`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Path to the `codegraph-cli` binary invoked as `worker` for each
    /// batch. Defaults to the current executable, so a `codegraph-cli
    /// consume` process re-execs itself per batch.
    pub worker_binary: PathBuf,
    pub db_url: String,
    pub consumer_name: String,
    pub consumer_group: String,
    pub batch_timeout: Duration,
    pub pending_check_interval: Duration,
    pub read_block: Duration,
}

impl ConsumerConfig {
    #[must_use]
    pub fn new(worker_binary: impl Into<PathBuf>, db_url: impl Into<String>, consumer_name: impl Into<String>) -> Self {
        Self {
            worker_binary: worker_binary.into(),
            db_url: db_url.into(),
            consumer_name: consumer_name.into(),
            consumer_group: "codegraph-indexers".into(),
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            pending_check_interval: DEFAULT_PENDING_CHECK_INTERVAL,
            read_block: DEFAULT_READ_BLOCK,
        }
    }
}

/// `{success_count, error_count}`, the JSON contract `codegraph-cli
/// worker` prints to stdout on success.
#[derive(Debug, Deserialize)]
struct WorkerResult {
    success_count: u32,
    error_count: u32,
}

/// Drives one repository's durable-stream batch pipeline: claims batches
/// off the stream, dispatches each to a fresh worker subprocess (never
/// loading embedding models in this process), tracks per-session
/// progress, and rebuilds the graph once the stream and pending queue
/// are both drained.
pub struct BatchConsumer<'a> {
    client: StreamClient,
    db: &'a CodegraphDb,
    config: ConsumerConfig,
}

impl<'a> BatchConsumer<'a> {
    /// # Errors
    /// Returns [`StreamError::Redis`] if the stream connection cannot be
    /// established.
    pub async fn connect(redis_url: &str, repository: &str, db: &'a CodegraphDb, config: ConsumerConfig) -> Result<Self, StreamError> {
        let client = StreamClient::connect(redis_url, repository, &config.consumer_group).await?;
        Ok(Self { client, db, config })
    }

    /// Runs the consumer loop for `repository` until the stream is
    /// drained (no new entries within one read-block window) or `stop`
    /// is set. Returns once this pass is complete; callers that want a
    /// continuously-running consumer call this in a loop themselves.
    ///
    /// # Errors
    /// Returns [`StreamError`] on a redis failure, or propagates a
    /// [`StreamError`] from a batch classified
    /// [`BatchErrorKind::Critical`] (the only kind that stops the
    /// consumer rather than leaving the batch pending for retry).
    pub async fn run(&mut self, repository: &str, stop: &AtomicBool) -> Result<(), StreamError> {
        self.client.ensure_consumer_group().await?;

        let mut last_pending_check = tokio::time::Instant::now();

        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            if last_pending_check.elapsed() >= self.config.pending_check_interval {
                self.reclaim_pending().await?;
                last_pending_check = tokio::time::Instant::now();
            }

            let entries = self.client.read_batch(&self.config.consumer_name, 1, self.config.read_block).await?;
            if entries.is_empty() {
                break;
            }

            for entry in &entries {
                self.process_entry(entry).await?;
            }
        }

        self.reclaim_pending().await?;

        if stop.load(Ordering::Relaxed) {
            return Ok(());
        }

        let remaining = self.client.pending_entries(Duration::ZERO, 1).await?;
        if remaining.is_empty() {
            self.finalize(repository).await?;
        }

        Ok(())
    }

    /// Dispatches one entry's batch to a worker subprocess, records its
    /// result against the entry's upload session, and acks unless the
    /// failure is retryable (in which case the entry is left pending for
    /// the next reclaim cycle).
    async fn process_entry(&mut self, entry: &StreamEntry) -> Result<(), StreamError> {
        match self.dispatch_worker(&entry.message.repository, &entry.message.files).await {
            Ok(result) => {
                if result.error_count > 0 {
                    warn!(batch = entry.message.batch_number, errors = result.error_count, "batch completed with per-file worker errors");
                }
                self.record_progress(&entry.message.upload_session_id, result.success_count, None).await?;
                self.client.ack(&entry.entry_id).await?;
                Ok(())
            }
            Err(err) => {
                let kind = BatchErrorKind::classify(&err.to_string());
                self.record_progress(&entry.message.upload_session_id, 0, Some(err.to_string())).await?;

                if kind.is_retryable() {
                    warn!(batch = entry.message.batch_number, error = %err, "batch failed, leaving pending for retry");
                } else {
                    warn!(batch = entry.message.batch_number, error = %err, "batch failed with a non-retryable error, acking as failed");
                    self.client.ack(&entry.entry_id).await?;
                }

                if kind.should_stop_consumer() {
                    return Err(err);
                }
                Ok(())
            }
        }
    }

    /// Finds pending entries idle past the configured threshold, reclaims
    /// each with `XCLAIM`, and retries it through the same dispatch path
    /// as a freshly-read entry.
    async fn reclaim_pending(&mut self) -> Result<(), StreamError> {
        let pending = self.client.pending_entries(self.config.pending_check_interval, 10).await?;
        for entry in pending {
            let Some(claimed) = self.client.claim(&self.config.consumer_name, &entry.entry_id, self.config.pending_check_interval).await?
            else {
                continue;
            };
            info!(entry_id = %claimed.entry_id, times_delivered = entry.times_delivered, "reclaiming abandoned batch");
            self.process_entry(&claimed).await?;
        }
        Ok(())
    }

    /// Rebuilds the graph and marks every non-terminal upload session for
    /// `repository` completed. Graph construction failures don't abort
    /// the run — indexing itself already succeeded, the graph is
    /// supplementary — matching the original's "still mark as completed"
    /// fallback.
    async fn finalize(&self, repository: &str) -> Result<(), StreamError> {
        if let Err(err) = codegraph_graph::build(self.db, repository).await {
            warn!(repository, error = %err, "graph construction failed, marking indexing complete anyway");
        }

        let session_repo = UploadSessionRepo::new(self.db);
        for mut session in session_repo.list_active(repository).await? {
            if session.status != UploadStatus::Error {
                session.status = UploadStatus::Completed;
            }
            session_repo.update(&session).await?;
        }
        Ok(())
    }

    async fn record_progress(&self, session_id: &str, success_count: u32, error: Option<String>) -> Result<(), StreamError> {
        let session_repo = UploadSessionRepo::new(self.db);
        let mut session: UploadSession = session_repo.get(session_id).await?;
        session.counters.stored += success_count;
        if let Some(err) = error {
            session.errors.push(err);
        }
        session.current_file = None;
        session.refresh_status();
        session_repo.update(&session).await?;
        Ok(())
    }

    /// Spawns `codegraph-cli worker --repository <repository> --db-url
    /// <url> --files <comma-separated>` and waits up to
    /// `config.batch_timeout`, killing the subprocess on timeout.
    async fn dispatch_worker(&self, repository: &str, files: &[String]) -> Result<WorkerResult, StreamError> {
        let mut command = Command::new(&self.config.worker_binary);
        command
            .arg("worker")
            .arg("--repository")
            .arg(repository)
            .arg("--db-url")
            .arg(&self.config.db_url)
            .arg("--files")
            .arg(files.join(","))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(StreamError::WorkerSpawn)?;

        let output = tokio::time::timeout(self.config.batch_timeout, child.wait_with_output())
            .await
            .map_err(|_| StreamError::WorkerTimeout(self.config.batch_timeout))?
            .map_err(StreamError::WorkerSpawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(StreamError::WorkerFailed(output.status.code().unwrap_or(-1), stderr));
        }

        serde_json::from_slice(&output.stdout).map_err(|err| StreamError::WorkerOutput(err.to_string()))
    }
}
