//! Job executor.
//!
//! Consumes deliveries from the queue, runs the pipeline under bounded
//! concurrency and a job-start rate cap, and owns the retry/DLQ decision:
//! a failed delivery is left pending for backoff redelivery until its
//! delivery count reaches the attempt limit, at which point the job is
//! permanently failed and dead-lettered.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sreel_providers::Pacer;
use sreel_queue::{GenerateVideoJob, JobQueue, JobStore, ProgressChannel};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::Pipeline;

/// State shared between the consume loop, the claim task, and job tasks.
struct Shared {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    pipeline: Arc<Pipeline>,
    store: JobStore,
    progress: ProgressChannel,
    start_pacer: Pacer,
}

impl Shared {
    /// Execute one delivery of a job.
    ///
    /// On success the message is acked and the dedup key released. On
    /// failure the message is deliberately not acked: it stays pending and
    /// the claim task redelivers it once its backoff elapses.
    async fn execute_delivery(&self, message_id: String, job: GenerateVideoJob) {
        self.start_pacer.acquire().await;

        let job_id = job.job_id.clone();
        info!(%job_id, %message_id, "Executing job");

        let result = match tokio::time::timeout(self.config.job_timeout, self.pipeline.run(&job))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout(self.config.job_timeout.as_secs())),
        };

        match result {
            Ok(()) => {
                info!(%job_id, "Job completed successfully");
                if let Err(e) = self.queue.ack(&message_id).await {
                    error!(%job_id, "Failed to ack job: {}", e);
                }
                if let Err(e) = self.queue.clear_dedup(&job).await {
                    warn!(%job_id, "Failed to clear dedup key: {}", e);
                }
            }
            Err(e) => {
                error!(%job_id, "Job attempt failed: {}", e);
                // No ack: the pending entry is redelivered after backoff.
            }
        }
    }

    /// Permanently fail a job whose delivery attempts are exhausted.
    async fn fail_permanently(&self, message_id: &str, job: &GenerateVideoJob, delivered: u64) {
        let mut message = "retry attempts exhausted".to_string();

        match self.store.load(&job.job_id).await {
            Ok(Some(mut record)) if !record.status.is_terminal() => {
                if let Some(last_error) = record.error.clone() {
                    message = last_error;
                }
                record.mark_failed(message.clone()).ok();
                if let Err(e) = self.store.save(&record).await {
                    error!(job_id = %job.job_id, "Failed to persist terminal failure: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => error!(job_id = %job.job_id, "Failed to load record for DLQ: {}", e),
        }

        warn!(
            job_id = %job.job_id,
            delivered,
            "Job exceeded max attempts, moving to DLQ"
        );

        if let Err(e) = self.queue.dlq(message_id, job, &message).await {
            error!(job_id = %job.job_id, "Failed to move job to DLQ: {}", e);
        }
        if let Err(e) = self.queue.clear_dedup(job).await {
            warn!(job_id = %job.job_id, "Failed to clear dedup key: {}", e);
        }
        self.progress.error(&job.job_id, message).await.ok();
    }
}

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    shared: Arc<Shared>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        config: WorkerConfig,
        queue: JobQueue,
        pipeline: Pipeline,
        store: JobStore,
        progress: ProgressChannel,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());
        let start_pacer = Pacer::per_minute(config.job_starts_per_minute);

        Self {
            shared: Arc::new(Shared {
                config,
                queue: Arc::new(queue),
                pipeline: Arc::new(pipeline),
                store,
                progress,
                start_pacer,
            }),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor. Returns when shutdown has been signalled and
    /// in-flight jobs have finished (or the grace period expired).
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.shared.config.max_concurrent_jobs
        );

        self.shared.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = self.spawn_claim_task();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.shared.config.shutdown_timeout, self.wait_for_jobs())
            .await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// A detached handle that signals shutdown, for signal handlers.
    pub fn shutdown_handle(&self) -> impl Fn() + Send + 'static {
        let tx = self.shutdown.clone();
        move || {
            let _ = tx.send(true);
        }
    }

    /// Consume new deliveries from the stream.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .shared
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let shared = Arc::clone(&self.shared);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::processing_failed("semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                shared.execute_delivery(message_id, job).await;
            });
        }

        Ok(())
    }

    /// Periodic task claiming pending deliveries whose backoff has elapsed.
    ///
    /// This is both the retry path and the stalled-job detector: entries
    /// abandoned by a dead worker become claimable here too.
    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(shared.config.claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let claimed = match shared.queue.claim_ready(&consumer_name, 5).await {
                            Ok(jobs) => jobs,
                            Err(e) => {
                                warn!("Failed to claim pending jobs: {}", e);
                                continue;
                            }
                        };

                        for (message_id, job, delivered) in claimed {
                            if delivered >= shared.queue.max_attempts() {
                                shared.fail_permanently(&message_id, &job, delivered).await;
                                continue;
                            }

                            let shared = Arc::clone(&shared);
                            let permit = match semaphore.clone().acquire_owned().await {
                                Ok(permit) => permit,
                                Err(_) => break,
                            };

                            tokio::spawn(async move {
                                let _permit = permit;
                                shared.execute_delivery(message_id, job).await;
                            });
                        }
                    }
                }
            }
        })
    }

    /// Wait for all in-flight jobs to release their permits.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.shared.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
