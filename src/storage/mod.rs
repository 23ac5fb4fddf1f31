// src/storage/mod.rs
//! Storage collaborator: the narrow contract the core uses to read artwork
//! rasters and write rendered artifacts. Keys are relative, slash-separated
//! paths; backends decide what they map to.

mod filesystem;

pub use filesystem::FilesystemStorage;

use crate::render::SharedData;
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("failed to read '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("failed to write '{path}': {reason}")]
    WriteFailed { path: String, reason: String },
}

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::ReadFailed { .. } => "STORAGE_READ_FAIL",
            StorageError::WriteFailed { .. } => "STORAGE_WRITE_FAIL",
        }
    }

    pub fn path(&self) -> &str {
        match self {
            StorageError::ReadFailed { path, .. } | StorageError::WriteFailed { path, .. } => path,
        }
    }
}

/// Binary blob storage.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `content` under `path`, returning the canonical URI of the
    /// written object.
    async fn write(&self, path: &str, content: &[u8]) -> Result<String, StorageError>;

    async fn exists(&self, path: &str) -> bool;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Per-operation resilience settings for storage access.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first.
    pub max_attempts: u32,
    /// Timeout applied to each individual attempt.
    pub op_timeout: Duration,
    /// Base delay for exponential backoff between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            op_timeout: Duration::from_secs(30),
            backoff: Duration::from_millis(250),
        }
    }
}

/// Wraps a [`Storage`] backend with per-operation timeouts and bounded
/// exponential-backoff retries.
#[derive(Clone)]
pub struct StorageClient {
    backend: Arc<dyn Storage>,
    policy: RetryPolicy,
}

impl StorageClient {
    pub fn new(backend: Arc<dyn Storage>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend(&self) -> &Arc<dyn Storage> {
        &self.backend
    }

    pub async fn read(&self, path: &str) -> Result<SharedData, StorageError> {
        let bytes = self
            .with_retries(path, "read", |p| {
                let backend = Arc::clone(&self.backend);
                async move { backend.read(&p).await }
            })
            .await
            .map_err(|reason| StorageError::ReadFailed { path: path.to_string(), reason })?;
        Ok(Arc::new(bytes))
    }

    pub async fn write(&self, path: &str, content: &[u8]) -> Result<String, StorageError> {
        self.with_retries(path, "write", |p| {
            let backend = Arc::clone(&self.backend);
            let content = content.to_vec();
            async move { backend.write(&p, &content).await }
        })
        .await
        .map_err(|reason| StorageError::WriteFailed { path: path.to_string(), reason })
    }

    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.backend.delete(path).await
    }

    async fn with_retries<T, F, Fut>(&self, path: &str, op: &str, mut call: F) -> Result<T, String>
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = Result<T, StorageError>>,
    {
        let mut last_error = String::new();
        for attempt in 1..=self.policy.max_attempts {
            match tokio::time::timeout(self.policy.op_timeout, call(path.to_string())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!("{} timed out after {:?}", op, self.policy.op_timeout)
                }
            }
            if attempt < self.policy.max_attempts {
                let delay = self.policy.backoff * 2u32.pow(attempt - 1);
                warn!(
                    "storage {} of '{}' failed (attempt {}/{}): {}; retrying in {:?}",
                    op, path, attempt, self.policy.max_attempts, last_error, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
        Err(format!("{} after {} attempts", last_error, self.policy.max_attempts))
    }
}
