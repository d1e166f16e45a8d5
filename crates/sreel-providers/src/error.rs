//! Provider error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from image/voice generation backends.
///
/// All variants are recoverable at the pipeline level: the fallback wrappers
/// absorb them and substitute a degraded artifact.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Backend request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Backend returned an empty result")]
    EmptyResult,

    #[error("Backend command failed: {message}")]
    CommandFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Backend timed out after {0} seconds")]
    Timeout(u64),

    #[error("Backend did not produce an output file: {0}")]
    MissingOutput(std::path::PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Media error: {0}")]
    Media(#[from] sreel_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn command_failed(msg: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::CommandFailed {
            message: msg.into(),
            exit_code,
        }
    }
}
