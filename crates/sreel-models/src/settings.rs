//! Per-job render settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visual style applied to generated scene images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    #[default]
    Realistic,
    Cinematic,
    Anime,
    DigitalArt,
    OilPainting,
    Cartoon,
}

impl ImageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Realistic => "realistic",
            ImageStyle::Cinematic => "cinematic",
            ImageStyle::Anime => "anime",
            ImageStyle::DigitalArt => "digital_art",
            ImageStyle::OilPainting => "oil_painting",
            ImageStyle::Cartoon => "cartoon",
        }
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImageStyle {
    type Err = std::convert::Infallible;

    /// Lenient parse: unknown styles fall back to `Realistic`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "cinematic" => ImageStyle::Cinematic,
            "anime" => ImageStyle::Anime,
            "digital_art" => ImageStyle::DigitalArt,
            "oil_painting" => ImageStyle::OilPainting,
            "cartoon" => ImageStyle::Cartoon,
            _ => ImageStyle::Realistic,
        })
    }
}

/// Settings attached to one generation job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobSettings {
    /// Voice name or provider voice ID for narration
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// Visual style for generated images
    #[serde(default)]
    pub image_style: ImageStyle,

    /// Mix background music under the narration
    #[serde(default = "default_true")]
    pub music_enabled: bool,

    /// Burn subtitles into the final video
    #[serde(default = "default_true")]
    pub subtitles_enabled: bool,
}

fn default_voice_id() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            voice_id: default_voice_id(),
            image_style: ImageStyle::Realistic,
            music_enabled: true,
            subtitles_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_style_falls_back_to_realistic() {
        assert_eq!("watercolor".parse::<ImageStyle>().unwrap(), ImageStyle::Realistic);
        assert_eq!("anime".parse::<ImageStyle>().unwrap(), ImageStyle::Anime);
        assert_eq!("Oil_Painting".parse::<ImageStyle>().unwrap(), ImageStyle::OilPainting);
    }

    #[test]
    fn settings_defaults() {
        let settings = JobSettings::default();
        assert_eq!(settings.voice_id, "default");
        assert_eq!(settings.image_style, ImageStyle::Realistic);
        assert!(settings.music_enabled);
        assert!(settings.subtitles_enabled);
    }

    #[test]
    fn settings_deserialize_with_missing_fields() {
        let settings: JobSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.voice_id, "default");
        assert!(settings.subtitles_enabled);
    }
}
