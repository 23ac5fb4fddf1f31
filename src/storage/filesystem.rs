// src/storage/filesystem.rs

use super::{Storage, StorageError};
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};

/// Filesystem-backed storage rooted at a base directory. Keys map directly
/// to relative paths beneath the root.
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    pub async fn new(root: PathBuf) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&root).await.map_err(|e| StorageError::WriteFailed {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        // Keys are always relative; reject traversal outside the root.
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative.components().any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(StorageError::ReadFailed {
                path: key.to_string(),
                reason: "key escapes the storage root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Storage for FilesystemStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| StorageError::ReadFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<String, StorageError> {
        let full = self.resolve(path).map_err(|e| StorageError::WriteFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| StorageError::WriteFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        }
        tokio::fs::write(&full, content).await.map_err(|e| StorageError::WriteFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        debug!("wrote {} byte(s) to {}", content.len(), full.display());
        Ok(path.to_string())
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(full) => tokio::fs::try_exists(&full).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailed {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path().to_path_buf()).await.unwrap();

        let uri = storage.write("tenant/1/outputs/j/base_1.pdf", b"%PDF-").await.unwrap();
        assert_eq!(uri, "tenant/1/outputs/j/base_1.pdf");
        assert!(storage.exists("tenant/1/outputs/j/base_1.pdf").await);
        assert_eq!(storage.read("tenant/1/outputs/j/base_1.pdf").await.unwrap(), b"%PDF-");

        storage.delete("tenant/1/outputs/j/base_1.pdf").await.unwrap();
        assert!(!storage.exists("tenant/1/outputs/j/base_1.pdf").await);
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path().to_path_buf()).await.unwrap();
        assert!(storage.read("../outside").await.is_err());
    }

    #[tokio::test]
    async fn missing_file_is_a_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path().to_path_buf()).await.unwrap();
        let err = storage.read("tenant/1/assets/missing.png").await.unwrap_err();
        assert_eq!(err.code(), "STORAGE_READ_FAIL");
    }
}
