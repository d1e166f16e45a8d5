//! S3-compatible object storage for published artifacts.

pub mod client;
pub mod error;
pub mod operations;

pub use client::{SpacesClient, SpacesConfig};
pub use error::{StorageError, StorageResult};
pub use operations::{thumbnail_key, video_key};
