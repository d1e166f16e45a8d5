//! Worker error types.

use thiserror::Error;

use sreel_models::{JobError, JobId};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job record not found: {0}")]
    JobNotFound(JobId),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Job record error: {0}")]
    Record(#[from] JobError),

    #[error("Provider error: {0}")]
    Provider(#[from] sreel_providers::ProviderError),

    #[error("Media error: {0}")]
    Media(#[from] sreel_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] sreel_queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] sreel_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }
}
