//! Image generation backends and the fallback wrapper.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::limiter::Pacer;
use crate::prompt::{build_prompt, NEGATIVE_PROMPT};
use sreel_media::fallback::placeholder_image;
use sreel_models::encoding::{FRAME_HEIGHT, FRAME_WIDTH};
use sreel_models::ImageStyle;

/// A pluggable image generation backend.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generate an image for `prompt` and write it to `output`.
    async fn generate(&self, prompt: &str, output: &Path) -> ProviderResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Configuration for the Stable Diffusion web-UI backend.
#[derive(Debug, Clone)]
pub struct SdWebuiConfig {
    /// Base URL of the txt2img API
    pub base_url: String,
    /// Sampling steps
    pub steps: u32,
    /// Request timeout
    pub timeout: Duration,
    /// Negative prompt
    pub negative_prompt: String,
}

impl Default for SdWebuiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7860".to_string(),
            steps: 25,
            timeout: Duration::from_secs(120),
            negative_prompt: NEGATIVE_PROMPT.to_string(),
        }
    }
}

impl SdWebuiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("IMAGE_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:7860".to_string()),
            steps: std::env::var("IMAGE_STEPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(25),
            timeout: Duration::from_secs(
                std::env::var("IMAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            negative_prompt: std::env::var("IMAGE_NEGATIVE_PROMPT")
                .unwrap_or_else(|_| NEGATIVE_PROMPT.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct Txt2ImgRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    steps: u32,
    sampler_name: &'a str,
    cfg_scale: u32,
    width: u32,
    height: u32,
    seed: i64,
    save_images: bool,
}

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// HTTP backend for an Automatic1111-compatible Stable Diffusion web UI.
pub struct SdWebuiBackend {
    http: Client,
    config: SdWebuiConfig,
}

impl SdWebuiBackend {
    /// Create a new backend.
    pub fn new(config: SdWebuiConfig) -> ProviderResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(SdWebuiConfig::from_env())
    }
}

#[async_trait]
impl ImageBackend for SdWebuiBackend {
    async fn generate(&self, prompt: &str, output: &Path) -> ProviderResult<()> {
        let url = format!("{}/sdapi/v1/txt2img", self.config.base_url);

        let payload = Txt2ImgRequest {
            prompt,
            negative_prompt: &self.config.negative_prompt,
            steps: self.config.steps,
            sampler_name: "DPM++ 2M Karras",
            cfg_scale: 7,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            seed: -1,
            save_images: false,
        };

        let response = self.http.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed { status, message });
        }

        let body: Txt2ImgResponse = response.json().await?;
        let image = body.images.first().ok_or(ProviderError::EmptyResult)?;
        if image.is_empty() {
            return Err(ProviderError::EmptyResult);
        }

        let bytes = BASE64.decode(image)?;
        tokio::fs::write(output, bytes).await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "sd_webui"
    }
}

/// Backend that shells out to a local generator script:
/// `<command> <prompt> <output>`.
pub struct ScriptImageBackend {
    command: PathBuf,
    timeout: Duration,
}

impl ScriptImageBackend {
    pub fn new(command: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let command = std::env::var("IMAGE_SCRIPT")
            .map_err(|_| ProviderError::config("IMAGE_SCRIPT not set"))?;
        let timeout = Duration::from_secs(
            std::env::var("IMAGE_SCRIPT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        );
        Ok(Self::new(command, timeout))
    }
}

#[async_trait]
impl ImageBackend for ScriptImageBackend {
    async fn generate(&self, prompt: &str, output: &Path) -> ProviderResult<()> {
        let child = tokio::process::Command::new(&self.command)
            .arg(prompt)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_secs()))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ProviderError::command_failed(
                stderr.trim().to_string(),
                result.status.code(),
            ));
        }

        if !output.exists() {
            return Err(ProviderError::MissingOutput(output.to_path_buf()));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "script"
    }
}

/// Build the configured image backend (`IMAGE_BACKEND`: `sd_webui` | `script`).
pub fn image_backend_from_env() -> ProviderResult<Arc<dyn ImageBackend>> {
    let kind = std::env::var("IMAGE_BACKEND").unwrap_or_else(|_| "sd_webui".to_string());

    match kind.as_str() {
        "sd_webui" | "a1111" => Ok(Arc::new(SdWebuiBackend::from_env()?)),
        "script" | "local" => Ok(Arc::new(ScriptImageBackend::from_env()?)),
        other => Err(ProviderError::config(format!(
            "unknown image backend: {}",
            other
        ))),
    }
}

/// The image provider pipeline: prompt construction, pacing, the configured
/// backend, and the placeholder fallback. A backend failure never escapes;
/// the scene gets a locally rendered stand-in instead.
pub struct ImageGenerator {
    backend: Arc<dyn ImageBackend>,
    pacer: Pacer,
    out_dir: PathBuf,
}

impl ImageGenerator {
    /// Create a new generator writing scene images under `out_dir`.
    pub fn new(backend: Arc<dyn ImageBackend>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            pacer: Pacer::for_images(),
            out_dir: out_dir.into(),
        }
    }

    /// Generate the image for one scene, falling back to a placeholder on
    /// backend failure.
    pub async fn generate_scene_image(
        &self,
        job_id: &str,
        scene_text: &str,
        index: usize,
        style: ImageStyle,
    ) -> ProviderResult<PathBuf> {
        tokio::fs::create_dir_all(&self.out_dir).await?;
        let output = self.out_dir.join(format!("{}_scene_{}.png", job_id, index));
        let prompt = build_prompt(scene_text, style);

        self.pacer.acquire().await;

        match self.backend.generate(&prompt, &output).await {
            Ok(()) => {
                info!(job_id, scene = index, backend = self.backend.name(), "Scene image generated");
            }
            Err(e) => {
                warn!(
                    job_id,
                    scene = index,
                    backend = self.backend.name(),
                    "Image generation failed, rendering placeholder: {}",
                    e
                );
                placeholder_image(scene_text, &output).await?;
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> SdWebuiBackend {
        SdWebuiBackend::new(SdWebuiConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sd_webui_decodes_and_writes_first_image() {
        let server = MockServer::start().await;
        let png_bytes = b"not-really-a-png";
        let body = serde_json::json!({ "images": [BASE64.encode(png_bytes)] });

        Mock::given(method("POST"))
            .and(path("/sdapi/v1/txt2img"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("scene_0.png");
        backend_for(&server)
            .generate("a castle at dusk", &output)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), png_bytes);
    }

    #[tokio::test]
    async fn sd_webui_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/txt2img"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = backend_for(&server)
            .generate("anything", &dir.path().join("x.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::RequestFailed { status: 500, .. }));
    }

    #[tokio::test]
    async fn sd_webui_rejects_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/txt2img"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "images": [] })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = backend_for(&server)
            .generate("anything", &dir.path().join("x.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::EmptyResult));
    }
}
