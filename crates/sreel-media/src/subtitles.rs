//! SRT subtitle generation.
//!
//! Cue `i` starts at the cumulative duration of scenes `0..i` and runs for
//! scene `i`'s duration; timecodes are `HH:MM:SS,mmm` with floored
//! milliseconds.

use sreel_models::SceneSummary;

/// Subtitle style burned into the video: white text, black outline, anchored
/// above the bottom edge.
pub const SUBTITLE_STYLE: &str = "FontName=Arial,FontSize=24,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BorderStyle=3,Outline=2,Shadow=1,MarginV=50,Alignment=2";

/// Format a second offset as an SRT timecode.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let millis = ((seconds % 1.0) * 1000.0).floor() as u64;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Render one SRT cue (1-based index, blank-line terminated).
fn format_cue(index: usize, start: f64, duration: f64, text: &str) -> String {
    format!(
        "{}\n{} --> {}\n{}\n",
        index + 1,
        format_timestamp(start),
        format_timestamp(start + duration),
        text
    )
}

/// Build the full SRT document for a scene list.
pub fn build_srt(scenes: &[SceneSummary]) -> String {
    let mut srt = String::new();
    let mut current = 0.0;

    for (i, scene) in scenes.iter().enumerate() {
        srt.push_str(&format_cue(i, current, scene.duration, &scene.text));
        srt.push('\n');
        current += scene.duration;
    }

    srt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(index: usize, text: &str, duration: f64) -> SceneSummary {
        SceneSummary {
            index,
            text: text.to_string(),
            duration,
        }
    }

    #[test]
    fn timestamps_have_millisecond_precision() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(3.0), "00:00:03,000");
        assert_eq!(format_timestamp(7.5), "00:00:07,500");
        assert_eq!(format_timestamp(3661.25), "01:01:01,250");
    }

    #[test]
    fn cues_accumulate_scene_durations() {
        let scenes = vec![
            scene(0, "first", 3.0),
            scene(1, "second", 4.5),
            scene(2, "third", 2.0),
        ];
        let srt = build_srt(&scenes);

        assert!(srt.contains("1\n00:00:00,000 --> 00:00:03,000\nfirst\n"));
        assert!(srt.contains("2\n00:00:03,000 --> 00:00:07,500\nsecond\n"));
        assert!(srt.contains("3\n00:00:07,500 --> 00:00:09,500\nthird\n"));
    }

    #[test]
    fn cues_are_separated_by_blank_lines() {
        let scenes = vec![scene(0, "a", 1.0), scene(1, "b", 1.0)];
        let srt = build_srt(&scenes);
        assert!(srt.contains("a\n\n2\n"));
        assert!(srt.ends_with("b\n\n"));
    }
}
