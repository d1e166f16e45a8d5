//! Encoding constants shared by the assembler chain.
//!
//! Stage 2 of the assembler concatenates per-scene clips with a stream copy,
//! which only works when every clip was encoded with identical parameters.
//! Keeping the parameters here, in one place, is what enforces that.

/// Output frame width (vertical format)
pub const FRAME_WIDTH: u32 = 1080;
/// Output frame height (vertical format)
pub const FRAME_HEIGHT: u32 = 1920;
/// Pixel format required for broad player compatibility
pub const PIXEL_FORMAT: &str = "yuv420p";

/// Video codec for all encode stages
pub const VIDEO_CODEC: &str = "libx264";
/// Tune preset for still-image scene clips
pub const SCENE_TUNE: &str = "stillimage";
/// Audio codec for all encode stages
pub const AUDIO_CODEC: &str = "aac";
/// Audio bitrate for scene clips and music mixing
pub const SCENE_AUDIO_BITRATE: &str = "192k";

/// Encoding preset for the delivery-optimization pass
pub const OPTIMIZE_PRESET: &str = "medium";
/// CRF for the delivery-optimization pass
pub const OPTIMIZE_CRF: u8 = 23;
/// Audio bitrate for the delivery-optimization pass
pub const OPTIMIZE_AUDIO_BITRATE: &str = "128k";

/// Thumbnail capture timestamp (seconds into the video)
pub const THUMBNAIL_TIMESTAMP: f64 = 1.0;
/// Thumbnail width
pub const THUMBNAIL_WIDTH: u32 = 540;
/// Thumbnail height
pub const THUMBNAIL_HEIGHT: u32 = 960;

/// Background music volume relative to narration
pub const MUSIC_VOLUME: f64 = 0.3;
/// Music fade-out start (seconds before applying the fade filter window)
pub const MUSIC_FADE_START: f64 = 5.0;
/// Music fade-out duration in seconds
pub const MUSIC_FADE_DURATION: f64 = 2.0;

/// Narration clips shorter than this are reported at this duration
pub const MIN_VOICE_DURATION: f64 = 2.0;
/// Duration of the silent fallback clip
pub const SILENT_FALLBACK_DURATION: f64 = 3.0;
/// Sample rate for synthesized and fallback audio
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Nominal frame rate reported in job metadata
pub const DEFAULT_FPS: u32 = 30;
