// src/jobs/store.rs
//! Job store abstraction. The production deployment backs this with the
//! shared job database; the crate ships an in-memory implementation used by
//! the worker binary and the test suite.

use super::models::{ItemOutcome, JobRecord, JobSpec, JobStatus};
use crate::manifest::Manifest;
use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Error, Debug, Clone)]
#[error("job store error: {0}")]
pub struct StoreError(pub String);

/// Queue plus status/result persistence for composition jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Add a new job; it starts out `pending`.
    async fn enqueue(&self, spec: JobSpec) -> Result<Uuid, StoreError>;

    /// Take the next pending job and mark it `processing`. Cancelled jobs
    /// are skipped. Returns `None` when the queue is empty.
    async fn dequeue(&self) -> Result<Option<(Uuid, JobSpec)>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;

    /// Coarse progress reporting at stage boundaries.
    async fn update_progress(&self, id: Uuid, progress: u8, message: &str)
        -> Result<(), StoreError>;

    /// Finalize as `completed`, persisting the manifest and per-item
    /// placement outcomes.
    async fn complete(
        &self,
        id: Uuid,
        manifest: Manifest,
        outcomes: Vec<ItemOutcome>,
    ) -> Result<(), StoreError>;

    /// Finalize as `failed`, persisting the error code and message verbatim
    /// together with whatever manifest was assembled.
    async fn fail(
        &self,
        id: Uuid,
        code: &str,
        message: &str,
        manifest: Option<Manifest>,
    ) -> Result<(), StoreError>;

    /// Cancel a job that has not started yet. Has no effect once the job is
    /// terminal; a processing job is only observed as cancelled by the
    /// pipeline at its next stage boundary.
    async fn cancel(&self, id: Uuid) -> Result<(), StoreError>;

    /// Whether a cancellation was requested for the job.
    async fn is_cancelled(&self, id: Uuid) -> bool;
}

struct Entry {
    record: JobRecord,
    spec: JobSpec,
}

/// In-memory job store.
#[derive(Default)]
pub struct InMemoryJobStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    jobs: HashMap<Uuid, Entry>,
    queue: VecDeque<Uuid>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, spec: JobSpec) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let record = JobRecord {
            id,
            tenant_id: spec.tenant_id,
            status: JobStatus::Pending,
            progress: None,
            message: None,
            error_code: None,
            error_message: None,
            manifest: None,
            item_outcomes: Vec::new(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        let mut state = self.state.lock().await;
        state.jobs.insert(id, Entry { record, spec });
        state.queue.push_back(id);
        info!("job {} enqueued", id);
        Ok(id)
    }

    async fn dequeue(&self) -> Result<Option<(Uuid, JobSpec)>, StoreError> {
        let mut state = self.state.lock().await;
        while let Some(id) = state.queue.pop_front() {
            let Some(entry) = state.jobs.get_mut(&id) else { continue };
            if entry.record.status != JobStatus::Pending {
                continue;
            }
            entry.record.status = JobStatus::Processing;
            entry.record.started_at = Some(Utc::now());
            entry.record.updated_at = Utc::now();
            return Ok(Some((id, entry.spec.clone())));
        }
        Ok(None)
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.jobs.get(&id).map(|e| e.record.clone()))
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: u8,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let entry = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError(format!("job {id} not found")))?;
        entry.record.progress = Some(progress.min(100));
        entry.record.message = Some(message.to_string());
        entry.record.updated_at = Utc::now();
        Ok(())
    }

    async fn complete(
        &self,
        id: Uuid,
        manifest: Manifest,
        outcomes: Vec<ItemOutcome>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let entry = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError(format!("job {id} not found")))?;
        entry.record.status = JobStatus::Completed;
        entry.record.progress = Some(100);
        entry.record.manifest = Some(manifest);
        entry.record.item_outcomes = outcomes;
        entry.record.completed_at = Some(Utc::now());
        entry.record.updated_at = Utc::now();
        info!("job {} completed", id);
        Ok(())
    }

    async fn fail(
        &self,
        id: Uuid,
        code: &str,
        message: &str,
        manifest: Option<Manifest>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let entry = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError(format!("job {id} not found")))?;
        entry.record.status = JobStatus::Failed;
        entry.record.error_code = Some(code.to_string());
        entry.record.error_message = Some(message.to_string());
        entry.record.manifest = manifest;
        entry.record.updated_at = Utc::now();
        warn!("job {} failed: {} ({})", id, message, code);
        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let entry = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError(format!("job {id} not found")))?;
        match entry.record.status {
            JobStatus::Pending | JobStatus::Processing => {
                entry.record.status = JobStatus::Cancelled;
                entry.record.updated_at = Utc::now();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn is_cancelled(&self, id: Uuid) -> bool {
        let state = self.state.lock().await;
        state
            .jobs
            .get(&id)
            .map(|e| e.record.status == JobStatus::Cancelled)
            .unwrap_or(false)
    }
}
