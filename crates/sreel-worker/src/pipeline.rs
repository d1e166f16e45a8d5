//! The generation pipeline for one job.
//!
//! Drives a job through `Splitting -> Imaging -> Narrating -> Rendering ->
//! Publishing`, updating the record and the progress channel at every stage
//! boundary, and cleans up the run's temp artifacts unconditionally on both
//! exit paths. Fatal errors are recorded on the job and rethrown to the
//! executor for the queue's retry policy.

use std::path::PathBuf;

use tracing::info;

use sreel_media::fs_utils::remove_with_prefix;
use sreel_media::{AssembleOptions, VideoAssembler};
use sreel_models::{JobRecord, JobStatus, Scene, SceneSummary, VideoOutput};
use sreel_providers::{split_scenes, ImageGenerator, VoiceSynthesizer};
use sreel_queue::{GenerateVideoJob, JobStore, ProgressChannel};
use sreel_storage::SpacesClient;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Splitting,
    Imaging,
    Narrating,
    Rendering,
    Publishing,
}

impl Stage {
    /// Progress band `(start, end)` owned by this stage.
    pub fn band(&self) -> (u8, u8) {
        match self {
            Stage::Splitting => (0, 15),
            Stage::Imaging => (15, 40),
            Stage::Narrating => (40, 65),
            Stage::Rendering => (65, 95),
            Stage::Publishing => (95, 100),
        }
    }

    /// Step label reported on the record.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Splitting => "Splitting text into scenes",
            Stage::Imaging => "Generating images",
            Stage::Narrating => "Generating narration",
            Stage::Rendering => "Rendering video",
            Stage::Publishing => "Publishing video",
        }
    }
}

/// Progress after finishing `completed` of `total` scene units within a
/// stage's band.
pub fn scene_progress(stage: Stage, completed: usize, total: usize) -> u8 {
    let (start, end) = stage.band();
    if total == 0 {
        return start;
    }
    let width = (end - start) as f64;
    let fraction = completed.min(total) as f64 / total as f64;
    start + (fraction * width).round() as u8
}

/// The per-job orchestrator with its injected collaborators.
pub struct Pipeline {
    config: WorkerConfig,
    store: JobStore,
    progress: ProgressChannel,
    publisher: SpacesClient,
    images: ImageGenerator,
    voices: VoiceSynthesizer,
    assembler: VideoAssembler,
}

impl Pipeline {
    /// Create a new pipeline from its collaborators.
    pub fn new(
        config: WorkerConfig,
        store: JobStore,
        progress: ProgressChannel,
        publisher: SpacesClient,
        images: ImageGenerator,
        voices: VoiceSynthesizer,
        assembler: VideoAssembler,
    ) -> Self {
        Self {
            config,
            store,
            progress,
            publisher,
            images,
            voices,
            assembler,
        }
    }

    /// Run the full pipeline for one job delivery.
    pub async fn run(&self, job: &GenerateVideoJob) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.job_id, "video_generation");
        logger.log_start("Starting video generation");

        let mut record = self
            .store
            .load(&job.job_id)
            .await?
            .ok_or_else(|| WorkerError::JobNotFound(job.job_id.clone()))?;

        if record.status.is_terminal() {
            logger.log_progress("Record already terminal, nothing to do");
            return Ok(());
        }

        if record.status == JobStatus::Pending {
            record.set_processing()?;
            self.store.save(&record).await?;
        }

        let heartbeat = self.spawn_heartbeat(job);
        let result = self.execute(&mut record, job).await;
        heartbeat.abort();

        self.cleanup(&job.job_id).await;

        match result {
            Ok(output) => {
                let video_url = output.video_url.clone();
                record.mark_completed(output)?;
                self.store.save(&record).await?;
                self.progress.done(&job.job_id, video_url).await.ok();
                logger.log_completion(&format!(
                    "Video published with {} scenes",
                    record.scenes.len()
                ));
                Ok(())
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                record.record_error(e.to_string()).ok();
                self.store.save(&record).await.ok();
                self.progress.error(&job.job_id, e.to_string()).await.ok();
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        record: &mut JobRecord,
        job: &GenerateVideoJob,
    ) -> WorkerResult<VideoOutput> {
        let job_id = job.job_id.as_str();

        // Stage 1: split the input into scenes.
        self.advance(record, 5, Stage::Splitting.label()).await?;
        let scene_texts = split_scenes(&job.input_text);
        if scene_texts.is_empty() {
            return Err(WorkerError::processing_failed(
                "input text produced no scenes",
            ));
        }
        info!(job_id, scenes = scene_texts.len(), "Input split into scenes");

        // Stage 2: one image per scene, sequential by design.
        self.advance(record, Stage::Imaging.band().0, Stage::Imaging.label())
            .await?;
        let mut image_paths: Vec<PathBuf> = Vec::with_capacity(scene_texts.len());
        for (i, text) in scene_texts.iter().enumerate() {
            let path = self
                .images
                .generate_scene_image(job_id, text, i, job.settings.image_style)
                .await?;
            image_paths.push(path);
            self.advance(
                record,
                scene_progress(Stage::Imaging, i + 1, scene_texts.len()),
                format!("Generated image {}/{}", i + 1, scene_texts.len()),
            )
            .await?;
        }

        // Stage 3: one narration clip per scene.
        self.advance(record, Stage::Narrating.band().0, Stage::Narrating.label())
            .await?;
        let mut scenes: Vec<Scene> = Vec::with_capacity(scene_texts.len());
        for (i, text) in scene_texts.iter().enumerate() {
            let (audio_path, duration) = self
                .voices
                .synthesize_scene(job_id, text, i, &job.settings.voice_id)
                .await?;
            scenes.push(Scene {
                index: i,
                text: text.clone(),
                image_path: image_paths[i].clone(),
                audio_path,
                duration,
            });
            self.advance(
                record,
                scene_progress(Stage::Narrating, i + 1, scene_texts.len()),
                format!("Generated narration {}/{}", i + 1, scene_texts.len()),
            )
            .await?;
        }

        // Persist the durable scene summaries now that durations are known.
        let summaries: Vec<SceneSummary> = scenes.iter().map(SceneSummary::from).collect();
        record.set_scenes(summaries)?;
        self.store.save(record).await?;

        // Stage 4: assemble the final video.
        self.advance(record, Stage::Rendering.band().0, Stage::Rendering.label())
            .await?;
        let assembled = self
            .assembler
            .assemble(
                job_id,
                &scenes,
                AssembleOptions {
                    subtitles_enabled: job.settings.subtitles_enabled,
                    music_enabled: job.settings.music_enabled,
                },
            )
            .await?;

        // Stage 5: publish video and thumbnail, read back metadata.
        self.advance(
            record,
            Stage::Publishing.band().0,
            Stage::Publishing.label(),
        )
        .await?;
        let (video_key, video_url) = self
            .publisher
            .upload_video(&assembled.video_path, job_id)
            .await?;
        let thumbnail_url = self
            .publisher
            .upload_thumbnail(&assembled.thumbnail_path, job_id)
            .await?;

        Ok(VideoOutput {
            video_key,
            video_url,
            thumbnail_url,
            duration: assembled.info.duration,
            file_size: assembled.info.size,
            resolution: assembled.info.resolution(),
            total_scenes: scenes.len(),
        })
    }

    /// Move the record forward and fan the update out to the progress
    /// channel. Persistence of the record is mandatory; the pub/sub echo is
    /// best-effort.
    async fn advance(
        &self,
        record: &mut JobRecord,
        percent: u8,
        step: impl Into<String>,
    ) -> WorkerResult<()> {
        let step = step.into();
        record.update_progress(percent, step.clone())?;
        self.store.save(record).await?;
        self.progress
            .progress(&record.job_id, record.progress, step)
            .await
            .ok();
        Ok(())
    }

    fn spawn_heartbeat(&self, job: &GenerateVideoJob) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let job_id = job.job_id.clone();
        let interval = self.config.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.heartbeat(&job_id).await.ok();
            }
        })
    }

    /// Delete every temp artifact of this run, on success and failure alike.
    async fn cleanup(&self, job_id: &sreel_models::JobId) {
        let prefix = format!("{}_", job_id);
        let dirs = [
            self.config.images_dir(),
            self.config.audio_dir(),
            self.config.scenes_dir(),
            self.config.final_dir(),
        ];

        let mut removed = 0;
        for dir in dirs {
            removed += remove_with_prefix(&dir, &prefix).await;
        }

        info!(job_id = %job_id, removed, "Cleaned up temp artifacts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_contiguous_and_end_at_100() {
        let stages = [
            Stage::Splitting,
            Stage::Imaging,
            Stage::Narrating,
            Stage::Rendering,
            Stage::Publishing,
        ];

        let mut previous_end = 0;
        for stage in stages {
            let (start, end) = stage.band();
            assert_eq!(start, previous_end, "band gap before {:?}", stage);
            assert!(end > start);
            previous_end = end;
        }
        assert_eq!(previous_end, 100);
    }

    #[test]
    fn scene_progress_is_monotonic_within_a_stage() {
        let total = 5;
        let mut last = 0;
        for completed in 0..=total {
            let p = scene_progress(Stage::Imaging, completed, total);
            assert!(p >= last);
            last = p;
        }
        assert_eq!(scene_progress(Stage::Imaging, total, total), 40);
    }

    #[test]
    fn scene_progress_stays_inside_the_band() {
        for completed in 0..=7 {
            let p = scene_progress(Stage::Narrating, completed, 7);
            assert!((40..=65).contains(&p));
        }
    }

    #[test]
    fn full_run_progress_sequence_is_non_decreasing() {
        // The exact update sequence the pipeline emits for a 3-scene job.
        let n = 3;
        let mut sequence = vec![5];
        sequence.push(Stage::Imaging.band().0);
        sequence.extend((1..=n).map(|i| scene_progress(Stage::Imaging, i, n)));
        sequence.push(Stage::Narrating.band().0);
        sequence.extend((1..=n).map(|i| scene_progress(Stage::Narrating, i, n)));
        sequence.push(Stage::Rendering.band().0);
        sequence.push(Stage::Publishing.band().0);
        sequence.push(100);

        let mut last = 0;
        for p in sequence {
            assert!(p >= last, "progress went backwards: {} < {}", p, last);
            last = p;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn zero_scenes_report_band_start() {
        assert_eq!(scene_progress(Stage::Imaging, 0, 0), 15);
    }
}
