//! Job record and lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::scene::SceneSummary;
use crate::settings::JobSettings;

/// Unique identifier for a job. Also the queue dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue
    #[default]
    Pending,
    /// Picked up by a worker
    Processing,
    /// Finished with a published artifact
    Completed,
    /// Finished with an error after exhausting retries
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal states accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from illegal job record mutations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum JobError {
    #[error("job {0} is in terminal state {1}")]
    TerminalState(JobId, JobStatus),

    #[error("job {0}: illegal transition {1} -> {2}")]
    IllegalTransition(JobId, JobStatus, JobStatus),
}

/// Published output of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoOutput {
    /// Object-storage key of the final video
    pub video_key: String,
    /// Public URL of the final video
    pub video_url: String,
    /// Public URL of the poster thumbnail
    pub thumbnail_url: String,
    /// Duration in seconds, probed from the final artifact
    pub duration: f64,
    /// File size in bytes
    pub file_size: u64,
    /// Resolution as "WxH"
    pub resolution: String,
    /// Number of scenes in the video
    pub total_scenes: usize,
}

/// The durable record of one text-to-video request.
///
/// Status only ever moves `pending -> processing -> {completed | failed}`;
/// all mutators reject calls once the record is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Unique job ID
    pub job_id: JobId,

    /// Original request text
    pub input_text: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Progress percentage (0-100), non-decreasing within one run
    #[serde(default)]
    pub progress: u8,

    /// Human-readable label of the active stage
    pub current_step: String,

    /// Scene summaries, persisted once narration durations are known
    #[serde(default)]
    pub scenes: Vec<SceneSummary>,

    /// Render settings
    pub settings: JobSettings,

    /// Published output, populated only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<VideoOutput>,

    /// Last fatal error message, populated only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Terminal-transition timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Whole seconds from creation to the terminal transition
    #[serde(default)]
    pub processing_secs: i64,
}

impl JobRecord {
    /// Create a new pending record.
    pub fn new(job_id: JobId, input_text: impl Into<String>, settings: JobSettings) -> Self {
        Self {
            job_id,
            input_text: input_text.into(),
            status: JobStatus::Pending,
            progress: 0,
            current_step: "queued".to_string(),
            scenes: Vec::new(),
            settings,
            output: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
            processing_secs: 0,
        }
    }

    fn reject_terminal(&self) -> Result<(), JobError> {
        if self.status.is_terminal() {
            Err(JobError::TerminalState(self.job_id.clone(), self.status))
        } else {
            Ok(())
        }
    }

    /// Transition `pending -> processing`.
    pub fn set_processing(&mut self) -> Result<(), JobError> {
        self.reject_terminal()?;
        if self.status != JobStatus::Pending {
            return Err(JobError::IllegalTransition(
                self.job_id.clone(),
                self.status,
                JobStatus::Processing,
            ));
        }
        self.status = JobStatus::Processing;
        Ok(())
    }

    /// Update progress and the current step label.
    ///
    /// Progress is clamped to 100 and never moves backwards.
    pub fn update_progress(
        &mut self,
        percent: u8,
        step: impl Into<String>,
    ) -> Result<(), JobError> {
        self.reject_terminal()?;
        self.progress = self.progress.max(percent.min(100));
        self.current_step = step.into();
        Ok(())
    }

    /// Replace the persisted scene summaries.
    pub fn set_scenes(&mut self, scenes: Vec<SceneSummary>) -> Result<(), JobError> {
        self.reject_terminal()?;
        self.scenes = scenes;
        Ok(())
    }

    /// Transition to `completed` with the published output.
    pub fn mark_completed(&mut self, output: VideoOutput) -> Result<(), JobError> {
        self.reject_terminal()?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.current_step = "completed".to_string();
        self.output = Some(output);
        self.finish();
        Ok(())
    }

    /// Record a fatal error for the current attempt without a terminal
    /// transition. The queue layer may still retry the run; `mark_failed`
    /// happens only once attempts are exhausted.
    pub fn record_error(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.reject_terminal()?;
        self.error = Some(message.into());
        Ok(())
    }

    /// Transition to `failed` with the last fatal error.
    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.reject_terminal()?;
        self.status = JobStatus::Failed;
        self.current_step = "failed".to_string();
        self.error = Some(message.into());
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.processing_secs = (now - self.created_at).num_seconds();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> JobRecord {
        JobRecord::new(JobId::new(), "a short story", JobSettings::default())
    }

    fn output() -> VideoOutput {
        VideoOutput {
            video_key: "videos/x/x_final.mp4".into(),
            video_url: "https://cdn.example.com/videos/x/x_final.mp4".into(),
            thumbnail_url: "https://cdn.example.com/videos/x/x_thumb.jpg".into(),
            duration: 12.5,
            file_size: 1_048_576,
            resolution: "1080x1920".into(),
            total_scenes: 3,
        }
    }

    #[test]
    fn happy_path_transitions() {
        let mut job = record();
        assert_eq!(job.status, JobStatus::Pending);

        job.set_processing().unwrap();
        assert_eq!(job.status, JobStatus::Processing);

        job.update_progress(40, "Generating images").unwrap();
        assert_eq!(job.progress, 40);
        assert_eq!(job.current_step, "Generating images");

        job.mark_completed(output()).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
        assert!(job.output.is_some());
    }

    #[test]
    fn progress_never_decreases() {
        let mut job = record();
        job.set_processing().unwrap();
        job.update_progress(65, "Rendering").unwrap();
        job.update_progress(40, "stale update").unwrap();
        assert_eq!(job.progress, 65);
    }

    #[test]
    fn terminal_state_rejects_mutation() {
        let mut job = record();
        job.set_processing().unwrap();
        job.mark_failed("encoder exploded").unwrap();

        assert!(matches!(
            job.update_progress(80, "late"),
            Err(JobError::TerminalState(_, JobStatus::Failed))
        ));
        assert!(job.mark_completed(output()).is_err());
        assert!(job.set_processing().is_err());
        assert_eq!(job.error.as_deref(), Some("encoder exploded"));
    }

    #[test]
    fn completed_rejects_failure() {
        let mut job = record();
        job.set_processing().unwrap();
        job.mark_completed(output()).unwrap();
        assert!(job.mark_failed("too late").is_err());
        assert!(job.error.is_none());
    }

    #[test]
    fn processing_requires_pending() {
        let mut job = record();
        job.set_processing().unwrap();
        assert!(matches!(
            job.set_processing(),
            Err(JobError::IllegalTransition(_, JobStatus::Processing, JobStatus::Processing))
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let mut job = record();
        job.set_processing().unwrap();
        job.update_progress(15, "Splitting text into scenes").unwrap();

        let json = serde_json::to_string(&job).unwrap();
        let decoded: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.job_id, job.job_id);
        assert_eq!(decoded.status, JobStatus::Processing);
        assert_eq!(decoded.progress, 15);
    }
}
