//! Redis-backed job record store.
//!
//! Record mutation semantics live on `JobRecord` itself; this store only
//! persists, and applies the retention policy on terminal writes.

use redis::AsyncCommands;
use tracing::debug;

use crate::error::{QueueError, QueueResult};
use sreel_models::{JobId, JobRecord};

/// Retention for completed job records.
pub const COMPLETED_TTL_SECS: u64 = 24 * 3600;
/// Retention for failed job records.
pub const FAILED_TTL_SECS: u64 = 7 * 24 * 3600;
/// Worker heartbeat expiry.
pub const HEARTBEAT_TTL_SECS: u64 = 90;

fn record_key(job_id: &JobId) -> String {
    format!("sreel:job:{}", job_id)
}

fn heartbeat_key(job_id: &JobId) -> String {
    format!("sreel:heartbeat:{}", job_id)
}

/// Store for durable job records.
#[derive(Clone)]
pub struct JobStore {
    client: redis::Client,
}

impl JobStore {
    /// Create a new store.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&redis_url)
    }

    /// Persist a record. Terminal records get their retention TTL; live
    /// records persist without expiry.
    pub async fn save(&self, record: &JobRecord) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = record_key(&record.job_id);
        let payload = serde_json::to_string(record)?;

        match record.status {
            s if s.is_terminal() => {
                let ttl = if s == sreel_models::JobStatus::Completed {
                    COMPLETED_TTL_SECS
                } else {
                    FAILED_TTL_SECS
                };
                conn.set_ex::<_, _, ()>(&key, payload, ttl).await?;
            }
            _ => {
                conn.set::<_, _, ()>(&key, payload).await?;
            }
        }

        debug!("Saved job record {} ({})", record.job_id, record.status);
        Ok(())
    }

    /// Create a record, rejecting an overwrite of an existing one.
    pub async fn create(&self, record: &JobRecord) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = record_key(&record.job_id);
        let payload = serde_json::to_string(record)?;

        let created: bool = redis::cmd("SET")
            .arg(&key)
            .arg(&payload)
            .arg("NX")
            .query_async::<Option<String>>(&mut conn)
            .await?
            .is_some();

        if !created {
            return Err(QueueError::enqueue_failed(format!(
                "job record {} already exists",
                record.job_id
            )));
        }

        Ok(())
    }

    /// Load a record, if present.
    pub async fn load(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(record_key(job_id)).await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Record a worker heartbeat for a processing job.
    pub async fn heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(heartbeat_key(job_id), "1", HEARTBEAT_TTL_SECS)
            .await?;
        Ok(())
    }

    /// Check whether a worker heartbeat is still live for a job.
    pub async fn has_heartbeat(&self, job_id: &JobId) -> QueueResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let exists: bool = conn.exists(heartbeat_key(job_id)).await?;
        Ok(exists)
    }
}
