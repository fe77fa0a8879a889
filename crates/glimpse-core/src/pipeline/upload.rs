//! Persisting uploaded images into the upload directory.

use std::path::{Path, PathBuf};

/// Writes uploads under a single server-controlled directory.
///
/// Files are overwritten when the same sanitized name is uploaded twice and
/// are never cleaned up.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Open the store, creating the directory if it does not exist.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("Upload directory ready at {:?}", dir);
        Ok(Self { dir })
    }

    /// The directory uploads are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under `filename`, which must already be sanitized.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("refusing to store upload under {filename:?}"),
            ));
        }
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Saved upload {:?} ({} bytes)", path, bytes.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("static").join("uploads");
        let store = UploadStore::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::open(root.path()).unwrap();
        let path = store.save("cat.jpg", b"data").await.unwrap();
        assert_eq!(path, root.path().join("cat.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_save_refuses_path_components() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::open(root.path()).unwrap();
        assert!(store.save("../escape.jpg", b"x").await.is_err());
        assert!(store.save("", b"x").await.is_err());
    }
}
