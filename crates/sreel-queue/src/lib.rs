//! Redis Streams job queue.
//!
//! This crate provides:
//! - Job enqueueing with per-job-id dedup
//! - Consumer-group consumption with retry backoff and DLQ
//! - Pending-claim recovery for stalled workers
//! - The durable job record store with retention TTLs
//! - Progress events via Redis Pub/Sub

pub mod error;
pub mod job;
pub mod progress;
pub mod queue;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use job::GenerateVideoJob;
pub use progress::{ProgressChannel, ProgressEvent, ProgressUpdate};
pub use queue::{retry_backoff, JobQueue, QueueConfig};
pub use status::{JobStore, COMPLETED_TTL_SECS, FAILED_TTL_SECS, HEARTBEAT_TTL_SECS};
