//! Job queue using Redis Streams.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::GenerateVideoJob;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Max delivery attempts before DLQ
    pub max_attempts: u64,
    /// Base retry backoff; attempt n waits `base * 2^(n-1)`
    pub retry_backoff: Duration,
    /// TTL for dedup keys
    pub dedup_ttl: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "sreel:jobs".to_string(),
            consumer_group: "sreel:workers".to_string(),
            dlq_stream_name: "sreel:dlq".to_string(),
            max_attempts: 3,
            retry_backoff: Duration::from_secs(5),
            dedup_ttl: Duration::from_secs(3600),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            max_attempts: std::env::var("QUEUE_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            retry_backoff: Duration::from_secs(
                std::env::var("QUEUE_RETRY_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            dedup_ttl: defaults.dedup_ttl,
        }
    }
}

/// Backoff before redelivering a job that has already been delivered
/// `delivery_count` times: exponential, starting at `base`.
pub fn retry_backoff(base: Duration, delivery_count: u64) -> Duration {
    let exponent = delivery_count.saturating_sub(1).min(16) as u32;
    base.saturating_mul(2u32.saturating_pow(exponent))
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    fn dedup_key(&self, job: &GenerateVideoJob) -> String {
        format!("sreel:dedup:{}", job.idempotency_key())
    }

    /// Enqueue a job.
    ///
    /// The job id is the dedup key: while an execution for this id is in
    /// flight, re-enqueueing is rejected.
    pub async fn enqueue(&self, job: &GenerateVideoJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let dedup_key = self.dedup_key(job);
        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            warn!("Duplicate job rejected: {}", job.job_id);
            return Err(QueueError::enqueue_failed("Duplicate job"));
        }

        let payload = serde_json::to_string(job)?;
        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        conn.set_ex::<_, _, ()>(&dedup_key, "1", self.config.dedup_ttl.as_secs())
            .await?;

        info!("Enqueued job {} with message ID {}", job.job_id, message_id);
        Ok(message_id)
    }

    /// Clear a job's dedup key so the same id can be enqueued again.
    pub async fn clear_dedup(&self, job: &GenerateVideoJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(self.dedup_key(job)).await?;
        Ok(())
    }

    /// Acknowledge a job (completed or dead-lettered).
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged job: {}", message_id);
        Ok(())
    }

    /// Move a job to the dead letter queue after exhausted retries.
    pub async fn dlq(
        &self,
        message_id: &str,
        job: &GenerateVideoJob,
        error: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;
        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;

        warn!("Moved job {} to DLQ: {}", job.job_id, error);
        Ok(())
    }

    /// Consume new jobs from the stream.
    ///
    /// Returns `(message_id, job)` pairs; malformed payloads are acked so
    /// they are not redelivered forever.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, GenerateVideoJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<GenerateVideoJob>(&payload_str) {
                        Ok(job) => {
                            debug!("Consumed job {} from stream", job.job_id);
                            jobs.push((message_id, job));
                        }
                        Err(e) => {
                            warn!("Failed to parse job payload: {}", e);
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Claim pending jobs whose redelivery backoff has elapsed.
    ///
    /// This covers both retry-after-failure and crashed/stalled workers: a
    /// consumer that stops acking loses its pending entries here once they
    /// sit idle past the backoff for their delivery count. Returns
    /// `(message_id, job, delivery_count)` tuples.
    pub async fn claim_ready(
        &self,
        consumer_name: &str,
        count: usize,
    ) -> QueueResult<Vec<(String, GenerateVideoJob, u64)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending: redis::streams::StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();

        for entry in pending.ids {
            let delivered = entry.times_delivered as u64;
            let idle_ms = entry.last_delivered_ms as u64;
            let required = retry_backoff(self.config.retry_backoff, delivered);
            if idle_ms < required.as_millis() as u64 {
                continue;
            }

            let claimed: redis::streams::StreamClaimReply = redis::cmd("XCLAIM")
                .arg(&self.config.stream_name)
                .arg(&self.config.consumer_group)
                .arg(consumer_name)
                .arg(required.as_millis() as u64)
                .arg(&entry.id)
                .query_async(&mut conn)
                .await?;

            for stream_entry in claimed.ids {
                let message_id = stream_entry.id.clone();

                if let Some(redis::Value::BulkString(payload)) = stream_entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<GenerateVideoJob>(&payload_str) {
                        Ok(job) => {
                            info!(
                                "Claimed pending job {} (delivery {})",
                                job.job_id,
                                delivered + 1
                            );
                            jobs.push((message_id, job, delivered));
                        }
                        Err(e) => {
                            warn!("Failed to parse claimed job payload: {}", e);
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Max delivery attempts from config.
    pub fn max_attempts(&self) -> u64 {
        self.config.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_secs(5);
        assert_eq!(retry_backoff(base, 0), Duration::from_secs(5));
        assert_eq!(retry_backoff(base, 1), Duration::from_secs(5));
        assert_eq!(retry_backoff(base, 2), Duration::from_secs(10));
        assert_eq!(retry_backoff(base, 3), Duration::from_secs(20));
    }

    #[test]
    fn backoff_is_capped() {
        let base = Duration::from_secs(5);
        assert_eq!(retry_backoff(base, 100), retry_backoff(base, 17));
    }
}
