//! FFprobe media information.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};
use sreel_models::encoding::{FRAME_HEIGHT, FRAME_WIDTH};

/// Probed information about a finished video file.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// File size in bytes
    pub size: u64,
}

impl VideoInfo {
    /// Resolution as "WxH".
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

async fn run_ffprobe(path: &Path) -> MediaResult<FfprobeOutput> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Probe a finished video for the metadata reported on the job record.
///
/// Missing fields fall back to the nominal frame size and zero, never to an
/// error: metadata degradation must not fail a rendered video.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let probe = run_ffprobe(path.as_ref()).await?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(VideoInfo {
        duration,
        width: video_stream.and_then(|s| s.width).unwrap_or(FRAME_WIDTH),
        height: video_stream.and_then(|s| s.height).unwrap_or(FRAME_HEIGHT),
        size,
    })
}

/// Probe the duration of an audio (or any media) file, in seconds.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let probe = run_ffprobe(path.as_ref()).await?;

    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::InvalidMedia("no duration in probe output".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_json() {
        let json = r#"{
            "format": {"duration": "9.500000", "size": "123456"},
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 1080, "height": 1920}
            ]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(probe.streams.len(), 2);
        assert_eq!(probe.format.duration.as_deref(), Some("9.500000"));
    }

    #[test]
    fn resolution_string() {
        let info = VideoInfo {
            duration: 1.0,
            width: 1080,
            height: 1920,
            size: 1,
        };
        assert_eq!(info.resolution(), "1080x1920");
    }
}
