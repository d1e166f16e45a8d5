//! The video assembly chain.
//!
//! A fixed sequence of encoder invocations turns per-scene images and audio
//! into the final vertical video: per-scene render, stream-copy concat,
//! optional subtitle burn, optional music mix, delivery optimization, and
//! thumbnail extraction. Per-scene render, concat, and thumbnail are fatal;
//! subtitles, music, and optimization degrade to a pass-through on failure.

use std::path::{Path, PathBuf};

use rand::Rng;
use tokio::fs;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::ensure_dir;
use crate::probe::{probe_video, VideoInfo};
use crate::subtitles::{build_srt, SUBTITLE_STYLE};
use sreel_models::encoding::{
    AUDIO_CODEC, FRAME_HEIGHT, FRAME_WIDTH, MUSIC_FADE_DURATION, MUSIC_FADE_START, MUSIC_VOLUME,
    OPTIMIZE_AUDIO_BITRATE, OPTIMIZE_CRF, OPTIMIZE_PRESET, PIXEL_FORMAT, SCENE_AUDIO_BITRATE,
    SCENE_TUNE, THUMBNAIL_HEIGHT, THUMBNAIL_TIMESTAMP, THUMBNAIL_WIDTH, VIDEO_CODEC,
};
use sreel_models::{Scene, SceneSummary};

/// Assembler configuration.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Directory for per-scene clip intermediates
    pub scenes_dir: PathBuf,
    /// Directory for concat/subtitle/music/optimize intermediates and output
    pub final_dir: PathBuf,
    /// Pool of background music tracks (`.mp3`)
    pub music_dir: PathBuf,
    /// Timeout applied to each encoder invocation
    pub encode_timeout_secs: u64,
}

impl AssemblerConfig {
    /// Derive the standard layout under a work directory.
    pub fn under_work_dir(work_dir: impl AsRef<Path>, music_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.as_ref();
        Self {
            scenes_dir: work_dir.join("scenes"),
            final_dir: work_dir.join("final"),
            music_dir: music_dir.into(),
            encode_timeout_secs: 600,
        }
    }
}

/// Options for one assembly run.
#[derive(Debug, Clone, Copy)]
pub struct AssembleOptions {
    pub subtitles_enabled: bool,
    pub music_enabled: bool,
}

/// A finished assembly: the final video, its poster frame, and the metadata
/// probed back from the artifact.
#[derive(Debug, Clone)]
pub struct AssembledVideo {
    pub video_path: PathBuf,
    pub thumbnail_path: PathBuf,
    pub info: VideoInfo,
}

/// Build the command rendering one scene clip from a looped image and the
/// narration audio.
///
/// Every scene in a run goes through this exact parameter set; the concat
/// stage's stream copy depends on that uniformity.
pub fn scene_clip_command(image: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
    let fit = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = FRAME_WIDTH,
        h = FRAME_HEIGHT
    );

    FfmpegCommand::new(output)
        .input_with_args(["-loop", "1"], image.to_string_lossy())
        .input(audio)
        .video_codec(VIDEO_CODEC)
        .output_args(["-tune", SCENE_TUNE])
        .audio_codec(AUDIO_CODEC)
        .audio_bitrate(SCENE_AUDIO_BITRATE)
        .pixel_format(PIXEL_FORMAT)
        .output_arg("-shortest")
        .video_filter(fit)
}

/// Render the concat-demuxer list file body, clips in scene-index order.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|p| format!("file '{}'", p.to_string_lossy().replace('\\', "/")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the stream-copy concatenation command.
pub fn concat_command(list_file: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input_with_args(["-f", "concat", "-safe", "0"], list_file.to_string_lossy())
        .output_args(["-c", "copy"])
}

/// Build the subtitle burn command.
pub fn subtitle_burn_command(video: &Path, srt: &Path, output: &Path) -> FfmpegCommand {
    let filter = format!(
        "subtitles='{}':force_style='{}'",
        srt.to_string_lossy(),
        SUBTITLE_STYLE
    );

    FfmpegCommand::new(output)
        .input(video)
        .video_filter(filter)
        .output_args(["-c:a", "copy"])
}

/// Build the background-music mix command: music looped under the narration
/// at low volume with a fade-out, video stream copied.
pub fn music_mix_command(video: &Path, music: &Path, output: &Path) -> FfmpegCommand {
    let filter = format!(
        "[1:a]volume={},afade=t=out:st={}:d={}[music];[0:a][music]amix=inputs=2:duration=first:dropout_transition=2[a]",
        MUSIC_VOLUME, MUSIC_FADE_START, MUSIC_FADE_DURATION
    );

    FfmpegCommand::new(output)
        .input(video)
        .input_with_args(["-stream_loop", "-1"], music.to_string_lossy())
        .filter_complex(filter)
        .output_args(["-map", "0:v", "-map", "[a]"])
        .output_args(["-c:v", "copy"])
        .audio_codec(AUDIO_CODEC)
        .audio_bitrate(SCENE_AUDIO_BITRATE)
}

/// Build the delivery-optimization command (streaming-friendly re-encode).
pub fn optimize_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(input)
        .video_codec(VIDEO_CODEC)
        .preset(OPTIMIZE_PRESET)
        .crf(OPTIMIZE_CRF)
        .audio_codec(AUDIO_CODEC)
        .audio_bitrate(OPTIMIZE_AUDIO_BITRATE)
        .output_args(["-movflags", "+faststart"])
}

/// Build the thumbnail extraction command.
pub fn thumbnail_command(video: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input_with_args(
            ["-ss".to_string(), format!("{}", THUMBNAIL_TIMESTAMP)],
            video.to_string_lossy(),
        )
        .single_frame()
        .video_filter(format!("scale={}:{}", THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT))
}

/// Deterministic chain of encoder invocations producing the final artifact.
pub struct VideoAssembler {
    config: AssemblerConfig,
    runner: FfmpegRunner,
}

impl VideoAssembler {
    /// Create a new assembler.
    pub fn new(config: AssemblerConfig) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.encode_timeout_secs);
        Self { config, runner }
    }

    /// Run the full chain for one job.
    pub async fn assemble(
        &self,
        job_id: &str,
        scenes: &[Scene],
        opts: AssembleOptions,
    ) -> MediaResult<AssembledVideo> {
        if scenes.is_empty() {
            return Err(MediaError::EmptyInput);
        }

        ensure_dir(&self.config.scenes_dir).await?;
        ensure_dir(&self.config.final_dir).await?;

        info!(job_id, scenes = scenes.len(), "Starting video assembly");

        let clips = self.render_scene_clips(job_id, scenes).await?;
        let concatenated = self.concatenate(job_id, &clips).await?;

        let mut current = concatenated;
        if opts.subtitles_enabled {
            current = self.add_subtitles(job_id, scenes, current).await;
        }
        if opts.music_enabled {
            current = self.add_music(job_id, current).await;
        }
        current = self.optimize(job_id, current).await;

        let thumbnail_path = self.extract_thumbnail(job_id, &current).await?;
        let info = probe_video(&current).await?;

        info!(
            job_id,
            duration = info.duration,
            size = info.size,
            "Video assembly complete"
        );

        Ok(AssembledVideo {
            video_path: current,
            thumbnail_path,
            info,
        })
    }

    /// Stage 1: render one clip per scene. Fatal on any failure.
    async fn render_scene_clips(
        &self,
        job_id: &str,
        scenes: &[Scene],
    ) -> MediaResult<Vec<PathBuf>> {
        let mut clips = Vec::with_capacity(scenes.len());

        for scene in scenes {
            let output = self
                .config
                .scenes_dir
                .join(format!("{}_scene_{}.mp4", job_id, scene.index));

            let cmd = scene_clip_command(&scene.image_path, &scene.audio_path, &output);
            self.runner.run(&cmd).await?;

            info!(job_id, scene = scene.index, "Scene clip rendered");
            clips.push(output);
        }

        Ok(clips)
    }

    /// Stage 2: stream-copy concat in scene-index order. Fatal on failure.
    async fn concatenate(&self, job_id: &str, clips: &[PathBuf]) -> MediaResult<PathBuf> {
        let list_path = self.config.final_dir.join(format!("{}_list.txt", job_id));
        let output = self.config.final_dir.join(format!("{}_concat.mp4", job_id));

        fs::write(&list_path, concat_list(clips)).await?;

        let result = self.runner.run(&concat_command(&list_path, &output)).await;
        fs::remove_file(&list_path).await.ok();
        result?;

        Ok(output)
    }

    /// Stage 3: burn subtitles. Best-effort; the input passes through on
    /// failure.
    async fn add_subtitles(&self, job_id: &str, scenes: &[Scene], video: PathBuf) -> PathBuf {
        let summaries: Vec<SceneSummary> = scenes.iter().map(SceneSummary::from).collect();
        let srt_path = self
            .config
            .final_dir
            .join(format!("{}_subtitles.srt", job_id));
        let output = self
            .config
            .final_dir
            .join(format!("{}_subtitled.mp4", job_id));

        if let Err(e) = fs::write(&srt_path, build_srt(&summaries)).await {
            warn!(job_id, "Failed to write subtitle file, skipping subtitles: {}", e);
            return video;
        }

        let result = self
            .runner
            .run(&subtitle_burn_command(&video, &srt_path, &output))
            .await;
        fs::remove_file(&srt_path).await.ok();

        match result {
            Ok(()) => output,
            Err(e) => {
                warn!(job_id, "Subtitle burn failed, using video without subtitles: {}", e);
                video
            }
        }
    }

    /// Stage 4: mix background music. Best-effort; an empty pool or a failed
    /// mix passes the input through.
    async fn add_music(&self, job_id: &str, video: PathBuf) -> PathBuf {
        let track = match self.pick_music_track().await {
            Some(track) => track,
            None => {
                info!(job_id, "No background music available, skipping");
                return video;
            }
        };

        let output = self
            .config
            .final_dir
            .join(format!("{}_with_music.mp4", job_id));

        match self
            .runner
            .run(&music_mix_command(&video, &track, &output))
            .await
        {
            Ok(()) => output,
            Err(e) => {
                warn!(job_id, "Music mix failed, using video without music: {}", e);
                video
            }
        }
    }

    /// Pick one `.mp3` uniformly at random from the music pool.
    async fn pick_music_track(&self) -> Option<PathBuf> {
        let mut entries = fs::read_dir(&self.config.music_dir).await.ok()?;
        let mut tracks = Vec::new();

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "mp3") {
                tracks.push(path);
            }
        }

        if tracks.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..tracks.len());
        Some(tracks.swap_remove(index))
    }

    /// Stage 5: streaming-friendly re-encode. Best-effort.
    async fn optimize(&self, job_id: &str, video: PathBuf) -> PathBuf {
        let output = self
            .config
            .final_dir
            .join(format!("{}_optimized.mp4", job_id));

        match self.runner.run(&optimize_command(&video, &output)).await {
            Ok(()) => output,
            Err(e) => {
                warn!(job_id, "Delivery optimization failed, using unoptimized video: {}", e);
                video
            }
        }
    }

    /// Stage 6: extract the poster frame. Fatal on failure.
    async fn extract_thumbnail(&self, job_id: &str, video: &Path) -> MediaResult<PathBuf> {
        let output = self.config.final_dir.join(format!("{}_thumb.jpg", job_id));
        self.runner.run(&thumbnail_command(video, &output)).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(index: usize) -> Scene {
        Scene {
            index,
            text: format!("scene {}", index),
            image_path: PathBuf::from(format!("/tmp/j_scene_{}.png", index)),
            audio_path: PathBuf::from(format!("/tmp/j_scene_{}.wav", index)),
            duration: 3.0,
        }
    }

    /// Everything after the input list must be byte-identical across scenes,
    /// otherwise the stream-copy concat would silently produce a broken file.
    #[test]
    fn scene_clip_parameters_are_uniform_across_scenes() {
        let out = PathBuf::from("/tmp/out.mp4");
        let extract_output_args = |s: &Scene| {
            let cmd = scene_clip_command(&s.image_path, &s.audio_path, &out);
            let args = cmd.build_args();
            let last_input = args.iter().rposition(|a| a == "-i").unwrap();
            args[last_input + 2..].to_vec()
        };

        let first = extract_output_args(&scene(0));
        for i in 1..4 {
            assert_eq!(extract_output_args(&scene(i)), first);
        }
    }

    #[test]
    fn scene_clip_command_pins_compatibility_parameters() {
        let cmd = scene_clip_command(
            &PathBuf::from("img.png"),
            &PathBuf::from("audio.wav"),
            &PathBuf::from("out.mp4"),
        );
        let args = cmd.build_args();

        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert!(args.windows(2).any(|w| w[0] == "-tune" && w[1] == "stillimage"));
        assert!(args.windows(2).any(|w| w[0] == "-pix_fmt" && w[1] == "yuv420p"));
        assert!(args.windows(2).any(|w| w[0] == "-b:a" && w[1] == "192k"));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args
            .iter()
            .any(|a| a.contains("scale=1080:1920:force_original_aspect_ratio=decrease")
                && a.contains("pad=1080:1920:(ow-iw)/2:(oh-ih)/2")));
    }

    #[test]
    fn concat_list_preserves_order_and_quotes() {
        let clips = vec![
            PathBuf::from("/tmp/j_scene_0.mp4"),
            PathBuf::from("/tmp/j_scene_1.mp4"),
        ];
        assert_eq!(
            concat_list(&clips),
            "file '/tmp/j_scene_0.mp4'\nfile '/tmp/j_scene_1.mp4'"
        );
    }

    #[test]
    fn concat_is_a_stream_copy() {
        let cmd = concat_command(&PathBuf::from("list.txt"), &PathBuf::from("out.mp4"));
        let args = cmd.build_args();
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "concat"));
        assert!(args.windows(2).any(|w| w[0] == "-safe" && w[1] == "0"));
        assert!(args.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
    }

    #[test]
    fn music_mix_keeps_video_and_ducks_music() {
        let cmd = music_mix_command(
            &PathBuf::from("in.mp4"),
            &PathBuf::from("track.mp3"),
            &PathBuf::from("out.mp4"),
        );
        let args = cmd.build_args();
        let filter = args
            .iter()
            .find(|a| a.contains("amix=inputs=2"))
            .expect("amix filter present");
        assert!(filter.contains("volume=0.3"));
        assert!(filter.contains("afade=t=out:st=5:d=2"));
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "copy"));
        assert!(args.windows(2).any(|w| w[0] == "-stream_loop" && w[1] == "-1"));
    }

    #[test]
    fn optimize_targets_progressive_playback() {
        let cmd = optimize_command(&PathBuf::from("in.mp4"), &PathBuf::from("out.mp4"));
        let args = cmd.build_args();
        assert!(args.windows(2).any(|w| w[0] == "-movflags" && w[1] == "+faststart"));
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "23"));
        assert!(args.windows(2).any(|w| w[0] == "-preset" && w[1] == "medium"));
    }

    #[test]
    fn thumbnail_grabs_one_scaled_frame() {
        let cmd = thumbnail_command(&PathBuf::from("in.mp4"), &PathBuf::from("thumb.jpg"));
        let args = cmd.build_args();
        assert!(args.windows(2).any(|w| w[0] == "-ss" && w[1] == "1"));
        assert!(args.windows(2).any(|w| w[0] == "-vframes" && w[1] == "1"));
        assert!(args.contains(&"scale=540:960".to_string()));
    }

    #[test]
    fn subtitle_burn_uses_forced_style() {
        let cmd = subtitle_burn_command(
            &PathBuf::from("in.mp4"),
            &PathBuf::from("subs.srt"),
            &PathBuf::from("out.mp4"),
        );
        let args = cmd.build_args();
        let filter = args.iter().find(|a| a.starts_with("subtitles=")).unwrap();
        assert!(filter.contains("force_style='FontName=Arial,FontSize=24"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "copy"));
    }
}
