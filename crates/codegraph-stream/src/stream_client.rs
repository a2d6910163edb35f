//! Thin wrapper over the `redis` crate's Streams commands (`XADD`,
//! `XGROUP CREATE`, `XREADGROUP`, `XACK`, `XPENDING`, `XCLAIM`), grounded
//! on `original_source/api/services/batch_indexing_consumer.py`'s use of
//! `redis.asyncio`'s equivalents.
//!
//! Uses a [`redis::aio::ConnectionManager`] rather than the plain
//! multiplexed connection `codegraph-cache::l2` uses: the consumer loop
//! runs for the lifetime of an indexing job and must survive a transient
//! redis restart without the caller re-dialing.

use std::time::Duration;

use codegraph_core::StreamMessage;
use redis::streams::{StreamClaimReply, StreamPendingCountReply, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::debug;

use crate::error::StreamError;

/// One still-unacknowledged stream entry, as reported by `XPENDING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub entry_id: String,
    pub consumer: String,
    pub idle_time_ms: i64,
    pub times_delivered: usize,
}

/// One entry read off the stream: its redis-assigned id plus the decoded
/// [`StreamMessage`] payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub entry_id: String,
    pub message: StreamMessage,
}

/// Low-level Streams verbs scoped to one `(stream_key, consumer_group)`
/// pair. [`crate::consumer::BatchConsumer`] is the orchestration layer
/// built on top of this.
pub struct StreamClient {
    manager: redis::aio::ConnectionManager,
    stream_key: String,
    consumer_group: String,
}

impl StreamClient {
    /// # Errors
    /// Returns [`StreamError::Redis`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str, repository: &str, consumer_group: &str) -> Result<Self, StreamError> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager, stream_key: stream_key(repository), consumer_group: consumer_group.to_string() })
    }

    /// Creates the consumer group at the start of the stream if it
    /// doesn't already exist, creating the stream itself (`MKSTREAM`) if
    /// needed. A `BUSYGROUP` response (group already exists) is not an
    /// error.
    ///
    /// # Errors
    /// Returns [`StreamError::Redis`] on any other server error.
    pub async fn ensure_consumer_group(&mut self) -> Result<(), StreamError> {
        let result: redis::RedisResult<()> =
            self.manager.xgroup_create_mkstream(&self.stream_key, &self.consumer_group, "0").await;
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.to_string().contains("BUSYGROUP") => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Appends `message` to the stream with an auto-generated id.
    ///
    /// # Errors
    /// Returns [`StreamError::Redis`] on a connection or command failure.
    pub async fn publish(&mut self, message: &StreamMessage) -> Result<String, StreamError> {
        let fields = message.to_fields();
        let field_refs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let id: String = self.manager.xadd(&self.stream_key, "*", &field_refs).await?;
        Ok(id)
    }

    /// Reads up to `count` new entries for `consumer`, blocking up to
    /// `block` for one to arrive. Returns an empty vec on a read timeout
    /// (no entries available), which the caller treats as "stream
    /// drained for now" rather than an error.
    ///
    /// # Errors
    /// Returns [`StreamError::Redis`] on a connection failure, or
    /// [`StreamError::MalformedEntry`] if an entry's fields don't decode
    /// into a [`StreamMessage`].
    pub async fn read_batch(&mut self, consumer: &str, count: usize, block: Duration) -> Result<Vec<StreamEntry>, StreamError> {
        let options = StreamReadOptions::default()
            .group(&self.consumer_group, consumer)
            .count(count)
            .block(u64::try_from(block.as_millis()).unwrap_or(u64::MAX));

        let reply: StreamReadReply = match self.manager.xread_options(&[&self.stream_key], &[">"], &options).await {
            Ok(reply) => reply,
            Err(err) if err.is_timeout() => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for key in reply.keys {
            for id in key.ids {
                let fields: Vec<(String, String)> = id
                    .map
                    .iter()
                    .filter_map(|(k, v)| redis::from_redis_value::<String>(v).ok().map(|v| (k.clone(), v)))
                    .collect();
                let message = StreamMessage::from_fields(&fields).ok_or(StreamError::MalformedEntry)?;
                entries.push(StreamEntry { entry_id: id.id, message });
            }
        }
        debug!(count = entries.len(), "read batch entries");
        Ok(entries)
    }

    /// Acknowledges `entry_id`, removing it from the consumer group's
    /// pending entries list.
    ///
    /// # Errors
    /// Returns [`StreamError::Redis`] on a connection or command failure.
    pub async fn ack(&mut self, entry_id: &str) -> Result<(), StreamError> {
        let _: usize = self.manager.xack(&self.stream_key, &self.consumer_group, &[entry_id]).await?;
        Ok(())
    }

    /// Lists up to `count` pending entries idle for at least
    /// `min_idle_time`.
    ///
    /// # Errors
    /// Returns [`StreamError::Redis`] on any error other than "group
    /// doesn't exist yet", which is treated as "no pending entries".
    pub async fn pending_entries(&mut self, min_idle_time: Duration, count: usize) -> Result<Vec<PendingEntry>, StreamError> {
        let reply: redis::RedisResult<StreamPendingCountReply> =
            self.manager.xpending_count(&self.stream_key, &self.consumer_group, "-", "+", count).await;
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) if err.to_string().contains("NOGROUP") => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let min_idle_ms = i64::try_from(min_idle_time.as_millis()).unwrap_or(i64::MAX);
        Ok(reply
            .ids
            .into_iter()
            .filter(|entry| entry.last_delivery_time >= min_idle_ms)
            .map(|entry| PendingEntry {
                entry_id: entry.id,
                consumer: entry.consumer,
                idle_time_ms: entry.last_delivery_time,
                times_delivered: entry.times_delivered,
            })
            .collect())
    }

    /// Claims `entry_id` for `consumer`, reassigning it away from
    /// whichever consumer last held it, and decodes the reclaimed
    /// message. Returns `None` if the entry was already claimed or acked
    /// by another consumer between the pending check and this call.
    ///
    /// # Errors
    /// Returns [`StreamError::Redis`] on a connection or command failure,
    /// or [`StreamError::MalformedEntry`] if the reclaimed entry's fields
    /// don't decode.
    pub async fn claim(&mut self, consumer: &str, entry_id: &str, min_idle_time: Duration) -> Result<Option<StreamEntry>, StreamError> {
        let min_idle_ms = u64::try_from(min_idle_time.as_millis()).unwrap_or(u64::MAX);
        let reply: StreamClaimReply =
            self.manager.xclaim(&self.stream_key, &self.consumer_group, consumer, min_idle_ms, &[entry_id]).await?;

        let Some(id) = reply.ids.into_iter().next() else {
            return Ok(None);
        };
        let fields: Vec<(String, String)> =
            id.map.iter().filter_map(|(k, v)| redis::from_redis_value::<String>(v).ok().map(|v| (k.clone(), v))).collect();
        let message = StreamMessage::from_fields(&fields).ok_or(StreamError::MalformedEntry)?;
        Ok(Some(StreamEntry { entry_id: id.id, message }))
    }
}

/// `indexing:jobs:{repository}`, matching the original consumer's key
/// template so a migrated deployment's in-flight streams stay readable.
#[must_use]
pub fn stream_key(repository: &str) -> String {
    format!("indexing:jobs:{repository}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_key_matches_template() {
        assert_eq!(stream_key("my-repo"), "indexing:jobs:my-repo");
    }
}
