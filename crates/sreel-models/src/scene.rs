//! Scene types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A scene during processing: one chunk of the input text together with the
/// media generated for it. Artifact paths are owned by a single orchestrator
/// run and are deleted when the run ends, whatever the outcome.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Zero-based position in the video
    pub index: usize,
    /// Text narrated and overlaid for this scene
    pub text: String,
    /// Generated (or placeholder) still image
    pub image_path: PathBuf,
    /// Synthesized (or silent) narration clip
    pub audio_path: PathBuf,
    /// Narration duration in seconds
    pub duration: f64,
}

/// The durable summary of a scene, persisted on the job record.
///
/// Full artifacts are transient; only this survives the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneSummary {
    pub index: usize,
    pub text: String,
    pub duration: f64,
}

impl From<&Scene> for SceneSummary {
    fn from(scene: &Scene) -> Self {
        Self {
            index: scene.index,
            text: scene.text.clone(),
            duration: scene.duration,
        }
    }
}
