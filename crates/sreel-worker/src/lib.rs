//! Video generation worker.
//!
//! This crate provides:
//! - The job executor (queue consumption, retry/DLQ, graceful shutdown)
//! - The pipeline orchestrator driving one job through its stages
//! - Worker configuration and structured job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use pipeline::{scene_progress, Pipeline, Stage};
