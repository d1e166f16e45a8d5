//! Video generation worker binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sreel_media::{AssemblerConfig, VideoAssembler};
use sreel_providers::{image_backend_from_env, voice_backend_from_env, ImageGenerator, VoiceSynthesizer};
use sreel_queue::{JobQueue, JobStore, ProgressChannel};
use sreel_storage::SpacesClient;
use sreel_worker::{JobExecutor, Pipeline, WorkerConfig};

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("sreel=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting sreel-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Err(e) = sreel_media::check_ffmpeg().and(sreel_media::check_ffprobe()) {
        error!("Encoder tooling missing: {}", e);
        std::process::exit(1);
    }

    let queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let store = match JobStore::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create job store: {}", e);
            std::process::exit(1);
        }
    };

    let progress = match ProgressChannel::from_env() {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create progress channel: {}", e);
            std::process::exit(1);
        }
    };

    let publisher = match SpacesClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let image_backend = match image_backend_from_env() {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to configure image backend: {}", e);
            std::process::exit(1);
        }
    };
    let voice_backend = match voice_backend_from_env() {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to configure voice backend: {}", e);
            std::process::exit(1);
        }
    };

    let images = ImageGenerator::new(image_backend, config.images_dir());
    let voices = VoiceSynthesizer::new(voice_backend, config.audio_dir());
    let assembler = VideoAssembler::new(AssemblerConfig::under_work_dir(
        &config.work_dir,
        config.music_dir.clone(),
    ));

    let pipeline = Pipeline::new(
        config.clone(),
        store.clone(),
        progress.clone(),
        publisher,
        images,
        voices,
        assembler,
    );

    let executor = JobExecutor::new(config, queue, pipeline, store, progress);

    // Graceful shutdown: let in-flight jobs finish within the grace period.
    let shutdown = executor.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
