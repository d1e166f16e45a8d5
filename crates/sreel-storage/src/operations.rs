//! High-level publish operations.

use std::path::Path;

use crate::client::SpacesClient;
use crate::error::StorageResult;

/// Storage key for a job's final video.
pub fn video_key(job_id: &str) -> String {
    format!("videos/{}/{}_final.mp4", job_id, job_id)
}

/// Storage key for a job's thumbnail.
pub fn thumbnail_key(job_id: &str) -> String {
    format!("videos/{}/{}_thumb.jpg", job_id, job_id)
}

impl SpacesClient {
    /// Publish the final video. Returns `(key, public_url)`.
    pub async fn upload_video(
        &self,
        path: impl AsRef<Path>,
        job_id: &str,
    ) -> StorageResult<(String, String)> {
        let key = video_key(job_id);
        let url = self.upload_file(path, &key, "video/mp4").await?;
        Ok((key, url))
    }

    /// Publish the poster thumbnail. Returns the public URL.
    pub async fn upload_thumbnail(
        &self,
        path: impl AsRef<Path>,
        job_id: &str,
    ) -> StorageResult<String> {
        let key = thumbnail_key(job_id);
        self.upload_file(path, &key, "image/jpeg").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_job_id() {
        assert_eq!(video_key("job-9"), "videos/job-9/job-9_final.mp4");
        assert_eq!(thumbnail_key("job-9"), "videos/job-9/job-9_thumb.jpg");
    }
}
