//! Image prompt construction.

use sreel_models::ImageStyle;

/// Default negative prompt sent to image backends that support one.
pub const NEGATIVE_PROMPT: &str =
    "blurry, bad quality, distorted, ugly, watermark, text, signature";

/// Style-specific phrase bank appended to every image prompt.
pub fn style_phrases(style: ImageStyle) -> &'static str {
    match style {
        ImageStyle::Realistic => "photorealistic, highly detailed, 8k, professional photography",
        ImageStyle::Cinematic => "cinematic lighting, movie scene, dramatic, epic",
        ImageStyle::Anime => "anime style, studio ghibli, vibrant colors, detailed",
        ImageStyle::DigitalArt => "digital art, concept art, trending on artstation",
        ImageStyle::OilPainting => "oil painting, artistic, brushstrokes, classical art",
        ImageStyle::Cartoon => "3d cartoon, pixar style, vibrant, cute",
    }
}

/// Build the full prompt for a scene image: the scene text, the style phrase
/// bank, and the quality/orientation qualifiers.
pub fn build_prompt(scene_text: &str, style: ImageStyle) -> String {
    format!(
        "{}, {}, high quality, masterpiece, vertical format, portrait orientation",
        scene_text,
        style_phrases(style)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_scene_text_and_style() {
        let prompt = build_prompt("a lighthouse in a storm", ImageStyle::Cinematic);
        assert!(prompt.starts_with("a lighthouse in a storm, cinematic lighting"));
        assert!(prompt.ends_with("vertical format, portrait orientation"));
    }

    #[test]
    fn unknown_styles_resolve_to_realistic_phrases() {
        // ImageStyle's lenient FromStr maps unknown names to Realistic, so
        // the prompt for them carries the realistic phrase bank.
        let style: ImageStyle = "vaporwave".parse().unwrap();
        let prompt = build_prompt("a quiet street", style);
        assert!(prompt.contains("photorealistic, highly detailed"));
    }
}
