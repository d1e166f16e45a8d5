//! Redis-backed integration tests.
//!
//! Run against a local Redis with:
//! `cargo test -p sreel-queue -- --ignored`

use sreel_models::{JobId, JobRecord, JobSettings, JobStatus};
use sreel_queue::{GenerateVideoJob, JobQueue, JobStore};

fn test_job() -> GenerateVideoJob {
    GenerateVideoJob::new(
        JobId::new(),
        "The lighthouse keeper climbed the stairs one last time tonight.",
        JobSettings::default(),
    )
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn queue_enqueue_consume_ack_roundtrip() {
    let queue = JobQueue::from_env().expect("create queue");
    queue.init().await.expect("init queue");

    let job = test_job();
    let message_id = queue.enqueue(&job).await.expect("enqueue");

    let consumed = queue
        .consume("itest-consumer", 1000, 10)
        .await
        .expect("consume");
    let entry = consumed
        .iter()
        .find(|(id, _)| id == &message_id)
        .expect("enqueued job delivered");
    assert_eq!(entry.1.job_id, job.job_id);

    queue.ack(&message_id).await.expect("ack");
    queue.clear_dedup(&job).await.expect("clear dedup");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn dedup_rejects_reenqueue_while_in_flight() {
    let queue = JobQueue::from_env().expect("create queue");
    queue.init().await.expect("init queue");

    let job = test_job();
    let message_id = queue.enqueue(&job).await.expect("first enqueue");

    // Same job id while in flight: rejected.
    assert!(queue.enqueue(&job).await.is_err());

    // After completion the dedup key is released and the id is usable again.
    queue.ack(&message_id).await.expect("ack");
    queue.clear_dedup(&job).await.expect("clear dedup");
    let message_id = queue.enqueue(&job).await.expect("re-enqueue after clear");
    queue.ack(&message_id).await.ok();
    queue.clear_dedup(&job).await.ok();
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn job_store_persists_lifecycle() {
    let store = JobStore::from_env().expect("create store");

    let mut record = JobRecord::new(
        JobId::new(),
        "A short story about a fox.",
        JobSettings::default(),
    );
    store.create(&record).await.expect("create record");

    record.set_processing().unwrap();
    record.update_progress(40, "Generating narration").unwrap();
    store.save(&record).await.expect("save record");

    let loaded = store
        .load(&record.job_id)
        .await
        .expect("load record")
        .expect("record exists");
    assert_eq!(loaded.status, JobStatus::Processing);
    assert_eq!(loaded.progress, 40);
    assert_eq!(loaded.current_step, "Generating narration");
}
