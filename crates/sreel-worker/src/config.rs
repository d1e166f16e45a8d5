//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs per worker process
    pub max_concurrent_jobs: usize,
    /// Per-job timeout covering the whole pipeline run
    pub job_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Work directory for temporary artifacts
    pub work_dir: PathBuf,
    /// Directory holding the background music pool
    pub music_dir: PathBuf,
    /// How often to scan for claimable pending jobs
    pub claim_interval: Duration,
    /// Cap on job starts per minute across this worker (shared API guard)
    pub job_starts_per_minute: u32,
    /// Interval for refreshing the job heartbeat while processing
    pub heartbeat_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            job_timeout: Duration::from_secs(1800),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: PathBuf::from("/tmp/sreel"),
            music_dir: PathBuf::from("assets/music"),
            claim_interval: Duration::from_secs(30),
            job_starts_per_minute: 10,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            music_dir: std::env::var("WORKER_MUSIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.music_dir),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            job_starts_per_minute: std::env::var("WORKER_JOB_STARTS_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.job_starts_per_minute),
            heartbeat_interval: Duration::from_secs(
                std::env::var("WORKER_JOB_HEARTBEAT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Directory for generated scene images.
    pub fn images_dir(&self) -> PathBuf {
        self.work_dir.join("images")
    }

    /// Directory for synthesized scene audio.
    pub fn audio_dir(&self) -> PathBuf {
        self.work_dir.join("audio")
    }

    /// Directory for per-scene clip intermediates.
    pub fn scenes_dir(&self) -> PathBuf {
        self.work_dir.join("scenes")
    }

    /// Directory for final-stage intermediates and outputs.
    pub fn final_dir(&self) -> PathBuf {
        self.work_dir.join("final")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dirs_are_namespaced_per_purpose() {
        let config = WorkerConfig::default();
        assert_eq!(config.images_dir(), PathBuf::from("/tmp/sreel/images"));
        assert_eq!(config.audio_dir(), PathBuf::from("/tmp/sreel/audio"));
        assert_eq!(config.scenes_dir(), PathBuf::from("/tmp/sreel/scenes"));
        assert_eq!(config.final_dir(), PathBuf::from("/tmp/sreel/final"));
    }

    #[test]
    fn defaults_bound_concurrency() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.job_starts_per_minute, 10);
    }
}
