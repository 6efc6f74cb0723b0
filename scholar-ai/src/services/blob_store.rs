//! Blob storage for exam images
//!
//! Paths are namespaced by owner (`{owner}/{millis}_{batch}_{index}_{name}`)
//! so access rules upstream can be expressed per owner prefix. The batch tag
//! keeps two batches submitted within the same millisecond apart.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("Blob backend error: {0}")]
    Backend(String),
}

/// Write-only blob storage returning an accessible URL
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError>;
}

/// Owner-scoped object path for one upload in a batch
pub fn blob_path(owner: Uuid, millis: i64, batch_tag: &str, index: usize, file_name: &str) -> String {
    format!(
        "{}/{}_{}_{}_{}",
        owner,
        millis,
        batch_tag,
        index,
        sanitize_file_name(file_name)
    )
}

/// Keep ASCII alphanumerics, dot, dash and underscore
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Blob store on the local filesystem under the root folder
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, public_base_url: Option<String>) -> Self {
        Self {
            root,
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(path);
        let safe = !path.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!(path, content_type, bytes = bytes.len(), "Stored blob");

        Ok(match &self.public_base_url {
            Some(base) => format!("{}/{}", base, path),
            None => format!("file://{}", target.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_path_is_owner_scoped() {
        let owner = Uuid::nil();
        assert_eq!(
            blob_path(owner, 1700000000000, "a1b2c3d4", 2, "page 1 (final).jpg"),
            "00000000-0000-0000-0000-000000000000/1700000000000_a1b2c3d4_2_page_1__final_.jpg"
        );
    }

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("..."), "image");
        assert_eq!(sanitize_file_name("错题.png"), "__.png");
    }

    #[tokio::test]
    async fn test_local_put_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf(), Some("https://cdn.example/exam-images/".into()));

        let url = store.put("owner/1_0_a.png", b"png", "image/png").await.unwrap();
        assert_eq!(url, "https://cdn.example/exam-images/owner/1_0_a.png");
        assert_eq!(std::fs::read(dir.path().join("owner/1_0_a.png")).unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_local_put_file_url_without_public_base() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf(), None);
        let url = store.put("o/x.png", b"1", "image/png").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("o/x.png"));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf(), None);
        for path in ["../x.png", "/abs.png", ""] {
            assert!(matches!(store.put(path, b"1", "image/png").await, Err(BlobError::InvalidPath(_))));
        }
    }
}
