//! Progress events via Redis Pub/Sub.

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sreel_models::JobId;

use crate::error::QueueResult;

/// One progress message for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressUpdate {
    /// Stage progress update
    Progress { percent: u8, step: String },
    /// Informational log line
    Log { message: String },
    /// Fatal error for this run
    Error { message: String },
    /// Job finished with a published video
    Done { video_url: String },
}

/// Progress event published to Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Job ID
    pub job_id: JobId,
    /// The update
    pub update: ProgressUpdate,
}

/// Channel for publishing/subscribing to progress events.
#[derive(Clone)]
pub struct ProgressChannel {
    client: redis::Client,
}

impl ProgressChannel {
    /// Create a new progress channel.
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

    /// Get the channel name for a job.
    pub fn channel_name(job_id: &JobId) -> String {
        format!("sreel:progress:{}", job_id)
    }

    /// Publish a progress event.
    pub async fn publish(&self, event: &ProgressEvent) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(&event.job_id);
        let payload = serde_json::to_string(event)?;

        debug!("Publishing progress event to {}", channel);
        conn.publish::<_, _, ()>(channel, payload).await?;

        Ok(())
    }

    /// Publish a progress update.
    pub async fn progress(
        &self,
        job_id: &JobId,
        percent: u8,
        step: impl Into<String>,
    ) -> QueueResult<()> {
        self.publish(&ProgressEvent {
            job_id: job_id.clone(),
            update: ProgressUpdate::Progress {
                percent,
                step: step.into(),
            },
        })
        .await
    }

    /// Publish a log message.
    pub async fn log(&self, job_id: &JobId, message: impl Into<String>) -> QueueResult<()> {
        self.publish(&ProgressEvent {
            job_id: job_id.clone(),
            update: ProgressUpdate::Log {
                message: message.into(),
            },
        })
        .await
    }

    /// Publish an error message.
    pub async fn error(&self, job_id: &JobId, message: impl Into<String>) -> QueueResult<()> {
        self.publish(&ProgressEvent {
            job_id: job_id.clone(),
            update: ProgressUpdate::Error {
                message: message.into(),
            },
        })
        .await
    }

    /// Publish a done message.
    pub async fn done(&self, job_id: &JobId, video_url: impl Into<String>) -> QueueResult<()> {
        self.publish(&ProgressEvent {
            job_id: job_id.clone(),
            update: ProgressUpdate::Done {
                video_url: video_url.into(),
            },
        })
        .await
    }

    /// Subscribe to progress events for a job.
    pub async fn subscribe(
        &self,
        job_id: &JobId,
    ) -> QueueResult<std::pin::Pin<Box<dyn futures_util::Stream<Item = ProgressEvent> + Send>>>
    {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        let channel = Self::channel_name(job_id);

        pubsub.subscribe(&channel).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_serde_roundtrip() {
        let event = ProgressEvent {
            job_id: JobId::from_string("job-1"),
            update: ProgressUpdate::Progress {
                percent: 40,
                step: "Generating narration".into(),
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"progress\""));

        let decoded: ProgressEvent = serde_json::from_str(&json).unwrap();
        match decoded.update {
            ProgressUpdate::Progress { percent, step } => {
                assert_eq!(percent, 40);
                assert_eq!(step, "Generating narration");
            }
            other => panic!("unexpected update: {other:?}"),
        }
    }
}
