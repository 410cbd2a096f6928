//! On-disk storage for accepted upload bytes.
//!
//! The stored path becomes the record's content reference; the directory is
//! owned by this store and names are sanitized and uuid-prefixed so uploads
//! can never traverse out of it or overwrite each other.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Create the upload directory if needed and return a store rooted there.
    pub async fn init(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Persist upload bytes and return the stored path.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = format!("{}-{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.dir.join(name);
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write upload to {}", path.display()))?;
        debug!(path = %path.display(), size = bytes.len(), "Stored upload");
        Ok(path)
    }
}

/// Strip path components and anything outside a conservative character set.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(|c| c == '_' || c == '.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("docsift-uploads-{}", Uuid::new_v4()))
    }

    #[test]
    fn sanitize_strips_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\temp\scan.png"), "scan.png");
    }

    #[test]
    fn sanitize_replaces_unusual_characters() {
        assert_eq!(sanitize_filename("my scan (1).png"), "my_scan__1_.png");
    }

    #[test]
    fn sanitize_never_returns_an_empty_name() {
        assert_eq!(sanitize_filename("../.."), "upload");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[tokio::test]
    async fn save_writes_bytes_under_the_store_directory() {
        let dir = temp_dir();
        let store = UploadStore::init(&dir).await.unwrap();

        let path = store.save("scan.png", b"fake image bytes").await.unwrap();
        assert!(path.starts_with(&dir));
        assert_eq!(fs::read(&path).await.unwrap(), b"fake image bytes");

        fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn identical_filenames_do_not_collide() {
        let dir = temp_dir();
        let store = UploadStore::init(&dir).await.unwrap();

        let first = store.save("scan.png", b"one").await.unwrap();
        let second = store.save("scan.png", b"two").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).await.unwrap(), b"one");
        assert_eq!(fs::read(&second).await.unwrap(), b"two");

        fs::remove_dir_all(&dir).await.unwrap();
    }
}
