//! Queue job payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sreel_models::{JobId, JobSettings};

/// Payload enqueued for one text-to-video generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateVideoJob {
    /// Unique job ID, also the dedup key
    pub job_id: JobId,
    /// Input text to turn into a video
    pub input_text: String,
    /// Render settings
    pub settings: JobSettings,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl GenerateVideoJob {
    /// Create a new job payload.
    pub fn new(job_id: JobId, input_text: impl Into<String>, settings: JobSettings) -> Self {
        Self {
            job_id,
            input_text: input_text.into(),
            settings,
            created_at: Utc::now(),
        }
    }

    /// Idempotency key for deduplication: at most one in-flight execution
    /// per job id.
    pub fn idempotency_key(&self) -> String {
        format!("generate:{}", self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        let job = GenerateVideoJob::new(
            JobId::from_string("job-42"),
            "Once upon a time.",
            JobSettings::default(),
        );

        let json = serde_json::to_string(&job).unwrap();
        let decoded: GenerateVideoJob = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.job_id, job.job_id);
        assert_eq!(decoded.input_text, job.input_text);
        assert_eq!(decoded.created_at, job.created_at);
    }

    #[test]
    fn idempotency_key_is_derived_from_job_id() {
        let job = GenerateVideoJob::new(
            JobId::from_string("job-42"),
            "text",
            JobSettings::default(),
        );
        assert_eq!(job.idempotency_key(), "generate:job-42");
    }
}
