//! Locally synthesized stand-in artifacts.
//!
//! When a provider backend fails, the pipeline substitutes a rendered
//! placeholder image or a silent narration clip so a single provider outage
//! never aborts the job.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use sreel_models::encoding::{AUDIO_SAMPLE_RATE, FRAME_HEIGHT, FRAME_WIDTH};

/// Max characters per rendered line in the placeholder overlay.
const PLACEHOLDER_WRAP_WIDTH: usize = 26;
/// Fill color of the placeholder frame.
const PLACEHOLDER_COLOR: &str = "0x1f2430";

/// Escape text for use inside a drawtext filter argument.
fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            ':' => escaped.push_str("\\:"),
            '%' => escaped.push_str("\\%"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Greedy word wrap so drawtext renders multiple centered lines.
fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}

/// Build the command rendering a placeholder frame with the scene text.
pub fn placeholder_image_command(text: &str, output: &Path) -> FfmpegCommand {
    let source = format!(
        "color=c={}:s={}x{}",
        PLACEHOLDER_COLOR, FRAME_WIDTH, FRAME_HEIGHT
    );
    let overlay = escape_drawtext(&wrap_text(text, PLACEHOLDER_WRAP_WIDTH));
    let filter = format!(
        "drawtext=text='{}':fontcolor=white:fontsize=56:x=(w-text_w)/2:y=(h-text_h)/2",
        overlay
    );

    FfmpegCommand::new(output)
        .input_with_args(["-f", "lavfi"], source)
        .video_filter(filter)
        .single_frame()
}

/// Render a placeholder image (solid fill with the scene text overlaid).
pub async fn placeholder_image(text: &str, output: impl AsRef<Path>) -> MediaResult<()> {
    let cmd = placeholder_image_command(text, output.as_ref());
    FfmpegRunner::new().with_timeout(60).run(&cmd).await
}

/// Build the command generating a silent stereo WAV clip.
pub fn silent_audio_command(duration: f64, output: &Path) -> FfmpegCommand {
    let source = format!("anullsrc=r={}:cl=stereo", AUDIO_SAMPLE_RATE);

    FfmpegCommand::new(output)
        .input_with_args(["-f", "lavfi"], source)
        .output_arg("-t")
        .output_arg(format!("{:.1}", duration))
}

/// Generate a silent audio clip of the given duration.
pub async fn silent_audio(duration: f64, output: impl AsRef<Path>) -> MediaResult<()> {
    let cmd = silent_audio_command(duration, output.as_ref());
    FfmpegRunner::new().with_timeout(60).run(&cmd).await
}

/// Transcode any audio input to the pipeline's WAV format (44.1 kHz stereo).
pub async fn transcode_to_wav(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(output.as_ref())
        .input(input.as_ref())
        .output_arg("-ar")
        .output_arg(AUDIO_SAMPLE_RATE.to_string())
        .output_args(["-ac", "2"]);
    FfmpegRunner::new().with_timeout(120).run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn drawtext_escaping() {
        assert_eq!(escape_drawtext("it's 50%: a\\b"), "it\\'s 50\\%\\: a\\\\b");
    }

    #[test]
    fn wrapping_keeps_words_intact() {
        let wrapped = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        for line in wrapped.lines() {
            assert!(line.len() <= 10 || !line.contains(' '));
        }
        let unwrapped: Vec<&str> = wrapped.split_whitespace().collect();
        assert_eq!(unwrapped.len(), 9);
    }

    #[test]
    fn placeholder_command_uses_lavfi_color_source() {
        let cmd = placeholder_image_command("hello world", &PathBuf::from("out.png"));
        let args = cmd.build_args();
        assert!(args.contains(&"lavfi".to_string()));
        assert!(args.iter().any(|a| a.starts_with("color=c=")));
        assert!(args.iter().any(|a| a.contains("drawtext=text='hello world'")));
        assert!(args.contains(&"-vframes".to_string()));
    }

    #[test]
    fn silent_audio_command_sets_duration() {
        let cmd = silent_audio_command(3.0, &PathBuf::from("out.wav"));
        let args = cmd.build_args();
        assert!(args.iter().any(|a| a.starts_with("anullsrc=r=44100")));
        assert!(args.contains(&"-t".to_string()));
        assert!(args.contains(&"3.0".to_string()));
    }
}
