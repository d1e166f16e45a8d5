//! Capability providers for the StoryReel pipeline.
//!
//! This crate provides:
//! - The scene splitter (pure text -> ordered bounded scenes)
//! - Image prompt construction with per-style phrase banks
//! - Pluggable image and voice backends behind strategy traits, selected by
//!   configuration through factories
//! - Fallback wrappers that substitute degraded artifacts so a provider
//!   failure never aborts a job
//! - Token-bucket pacing for external calls

pub mod error;
pub mod image;
pub mod limiter;
pub mod prompt;
pub mod splitter;
pub mod voice;

pub use error::{ProviderError, ProviderResult};
pub use image::{image_backend_from_env, ImageBackend, ImageGenerator, SdWebuiBackend, ScriptImageBackend};
pub use limiter::Pacer;
pub use prompt::build_prompt;
pub use splitter::split_scenes;
pub use voice::{voice_backend_from_env, ElevenLabsBackend, ScriptVoiceBackend, VoiceBackend, VoiceSynthesizer};
