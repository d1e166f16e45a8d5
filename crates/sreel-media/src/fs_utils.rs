//! Filesystem utilities for run-scoped temp artifacts.

use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Create a directory (and parents) if it does not exist.
pub async fn ensure_dir(dir: impl AsRef<Path>) -> MediaResult<()> {
    fs::create_dir_all(dir.as_ref()).await?;
    Ok(())
}

/// Remove every file in `dir` whose name starts with `prefix`.
///
/// Returns the number of files removed. A missing directory counts as
/// nothing to remove; per-file failures are logged and skipped so cleanup
/// always makes as much progress as it can.
pub async fn remove_with_prefix(dir: impl AsRef<Path>, prefix: &str) -> usize {
    let dir = dir.as_ref();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(prefix) {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", entry.path().display(), e);
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn removes_only_prefixed_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("job-1_scene_0.png"), b"x")
            .await
            .unwrap();
        fs::write(dir.path().join("job-1_final.mp4"), b"x")
            .await
            .unwrap();
        fs::write(dir.path().join("job-2_scene_0.png"), b"x")
            .await
            .unwrap();

        let removed = remove_with_prefix(dir.path(), "job-1_").await;
        assert_eq!(removed, 2);
        assert!(dir.path().join("job-2_scene_0.png").exists());
    }

    #[tokio::test]
    async fn missing_directory_removes_nothing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(remove_with_prefix(&missing, "job-1_").await, 0);
    }
}
