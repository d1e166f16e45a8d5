//! Voice synthesis backends and the fallback wrapper.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::limiter::Pacer;
use sreel_media::fallback::{silent_audio, transcode_to_wav};
use sreel_media::probe::probe_duration;
use sreel_models::encoding::{MIN_VOICE_DURATION, SILENT_FALLBACK_DURATION};

/// A pluggable voice synthesis backend.
#[async_trait]
pub trait VoiceBackend: Send + Sync {
    /// Synthesize `text` with the given voice and write a WAV to `output`.
    async fn synthesize(&self, text: &str, voice_id: &str, output: &Path) -> ProviderResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Resolve a friendly voice alias to a concrete provider voice ID.
///
/// Unknown aliases fall back to the default narrator voice; anything that
/// already looks like a raw ID is passed through untouched.
pub fn resolve_voice_alias(voice_id: &str) -> &str {
    match voice_id {
        "default" | "female" => "21m00Tcm4TlvDq8ikWAM",
        "male" => "ErXwobaYiN019PkySvjV",
        "british" => "pNInz6obpgDQGcFmaJgB",
        other if other.len() >= 16 => other,
        _ => "21m00Tcm4TlvDq8ikWAM",
    }
}

/// Configuration for the ElevenLabs backend.
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    /// API key
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl ElevenLabsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Ok(Self {
            api_key: std::env::var("ELEVENLABS_API_KEY")
                .map_err(|_| ProviderError::config("ELEVENLABS_API_KEY not set"))?,
            base_url: std::env::var("ELEVENLABS_API_URL")
                .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string()),
            timeout: Duration::from_secs(
                std::env::var("VOICE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

/// HTTP backend for the ElevenLabs text-to-speech API.
pub struct ElevenLabsBackend {
    http: Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsBackend {
    /// Create a new backend.
    pub fn new(config: ElevenLabsConfig) -> ProviderResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ElevenLabsConfig::from_env()?)
    }
}

#[async_trait]
impl VoiceBackend for ElevenLabsBackend {
    async fn synthesize(&self, text: &str, voice_id: &str, output: &Path) -> ProviderResult<()> {
        let voice = resolve_voice_alias(voice_id);
        let url = format!("{}/v1/text-to-speech/{}", self.config.base_url, voice);

        let payload = TtsRequest {
            text,
            model_id: "eleven_monolingual_v1",
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed { status, message });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::EmptyResult);
        }

        // The API returns MP3; the assembler expects 44.1 kHz stereo WAV.
        let mp3_path = output.with_extension("mp3");
        tokio::fs::write(&mp3_path, &bytes).await?;
        let transcoded = transcode_to_wav(&mp3_path, output).await;
        tokio::fs::remove_file(&mp3_path).await.ok();
        transcoded?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

/// Backend that shells out to a local TTS script:
/// `<command> --text <text> --output <path> --voice <voice>`.
pub struct ScriptVoiceBackend {
    command: PathBuf,
    timeout: Duration,
}

impl ScriptVoiceBackend {
    pub fn new(command: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let command = std::env::var("VOICE_SCRIPT")
            .map_err(|_| ProviderError::config("VOICE_SCRIPT not set"))?;
        let timeout = Duration::from_secs(
            std::env::var("VOICE_SCRIPT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        );
        Ok(Self::new(command, timeout))
    }
}

#[async_trait]
impl VoiceBackend for ScriptVoiceBackend {
    async fn synthesize(&self, text: &str, voice_id: &str, output: &Path) -> ProviderResult<()> {
        let child = tokio::process::Command::new(&self.command)
            .arg("--text")
            .arg(text)
            .arg("--output")
            .arg(output)
            .arg("--voice")
            .arg(voice_id)
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

/// Build the configured voice backend (`VOICE_BACKEND`: `elevenlabs` | `script`).
pub fn voice_backend_from_env() -> ProviderResult<Arc<dyn VoiceBackend>> {
    let kind = std::env::var("VOICE_BACKEND").unwrap_or_else(|_| "elevenlabs".to_string());

    match kind.as_str() {
        "elevenlabs" => Ok(Arc::new(ElevenLabsBackend::from_env()?)),
        "script" | "local" => Ok(Arc::new(ScriptVoiceBackend::from_env()?)),
        other => Err(ProviderError::config(format!(
            "unknown voice backend: {}",
            other
        ))),
    }
}

/// The voice provider pipeline: pacing, the configured backend, duration
/// probing with the minimum floor, and the silent-clip fallback.
pub struct VoiceSynthesizer {
    backend: Arc<dyn VoiceBackend>,
    pacer: Pacer,
    out_dir: PathBuf,
}

impl VoiceSynthesizer {
    /// Create a new synthesizer writing scene audio under `out_dir`.
    pub fn new(backend: Arc<dyn VoiceBackend>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            pacer: Pacer::for_audio(),
            out_dir: out_dir.into(),
        }
    }

    /// Synthesize narration for one scene, falling back to a silent clip on
    /// backend failure. Returns the audio path and its duration in seconds.
    pub async fn synthesize_scene(
        &self,
        job_id: &str,
        text: &str,
        index: usize,
        voice_id: &str,
    ) -> ProviderResult<(PathBuf, f64)> {
        tokio::fs::create_dir_all(&self.out_dir).await?;
        let output = self.out_dir.join(format!("{}_scene_{}.wav", job_id, index));

        self.pacer.acquire().await;

        match self.backend.synthesize(text, voice_id, &output).await {
            Ok(()) => {
                let duration = probe_duration(&output).await?.max(MIN_VOICE_DURATION);
                info!(
                    job_id,
                    scene = index,
                    backend = self.backend.name(),
                    duration,
                    "Scene narration synthesized"
                );
                Ok((output, duration))
            }
            Err(e) => {
                warn!(
                    job_id,
                    scene = index,
                    backend = self.backend.name(),
                    "Voice synthesis failed, using silent clip: {}",
                    e
                );
                silent_audio(SILENT_FALLBACK_DURATION, &output).await?;
                Ok((output, SILENT_FALLBACK_DURATION))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_provider_ids() {
        assert_eq!(resolve_voice_alias("default"), "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(resolve_voice_alias("male"), "ErXwobaYiN019PkySvjV");
        assert_eq!(resolve_voice_alias("female"), "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(resolve_voice_alias("british"), "pNInz6obpgDQGcFmaJgB");
    }

    #[test]
    fn raw_ids_pass_through_and_junk_falls_back() {
        assert_eq!(
            resolve_voice_alias("pMsXgVXv3BLzUgSXRplE"),
            "pMsXgVXv3BLzUgSXRplE"
        );
        assert_eq!(resolve_voice_alias("whisper"), "21m00Tcm4TlvDq8ikWAM");
    }
}
