// src/jobs/worker.rs
//! Background worker: polls the job store, runs one job at a time through
//! the pipeline and persists the outcome. Multiple workers may run against
//! the same store; each job is claimed atomically by `dequeue`.

use super::models::JobStatus;
use super::store::{JobStore, StoreError};
use crate::pipeline::{CancelFlag, JobControl, Pipeline, ProgressSink};
use async_trait::async_trait;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use uuid::Uuid;

/// Mirrors pipeline progress into the job store.
struct StoreProgress {
    store: Arc<dyn JobStore>,
    job_id: Uuid,
}

#[async_trait]
impl ProgressSink for StoreProgress {
    async fn report(&self, progress: u8, message: &str) {
        if let Err(e) = self.store.update_progress(self.job_id, progress, message).await {
            error!("progress update for job {} failed: {}", self.job_id, e);
        }
    }
}

pub struct Worker {
    store: Arc<dyn JobStore>,
    pipeline: Arc<Pipeline>,
    poll_interval: Duration,
    worker_id: usize,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        pipeline: Arc<Pipeline>,
        poll_interval: Duration,
        worker_id: usize,
    ) -> Self {
        Self { store, pipeline, poll_interval, worker_id }
    }

    /// Run the polling loop indefinitely.
    pub async fn run(self) {
        info!("worker {} started", self.worker_id);
        let mut ticker = interval(self.poll_interval);
        loop {
            ticker.tick().await;
            match self.process_next_job().await {
                Ok(true) => ticker.reset(),
                Ok(false) => {}
                Err(e) => error!("worker {} error: {}", self.worker_id, e),
            }
        }
    }

    /// Process the next available job. Returns `Ok(true)` when a job was
    /// claimed, `Ok(false)` when the queue was empty.
    pub async fn process_next_job(&self) -> Result<bool, StoreError> {
        let Some((job_id, spec)) = self.store.dequeue().await? else {
            return Ok(false);
        };
        info!(
            "worker {} processing job {} ({} item(s), mode {})",
            self.worker_id,
            job_id,
            spec.items.len(),
            spec.mode
        );

        // Mirror store-side cancellation into the pipeline's cooperative
        // flag so it is observed at the next stage or base boundary.
        let cancel = CancelFlag::new();
        let watcher = {
            let store = Arc::clone(&self.store);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut ticker = interval(Duration::from_millis(250));
                loop {
                    ticker.tick().await;
                    if store.is_cancelled(job_id).await {
                        cancel.cancel();
                        break;
                    }
                }
            })
        };

        let ctl = JobControl {
            cancel,
            progress: Arc::new(StoreProgress { store: Arc::clone(&self.store), job_id }),
        };
        let outcome = self.pipeline.run(job_id, &spec, &ctl).await;
        watcher.abort();

        match outcome.status {
            JobStatus::Completed => {
                self.store.complete(job_id, outcome.manifest, outcome.item_outcomes).await?;
            }
            JobStatus::Cancelled => {
                // The store already carries the cancelled state; nothing to
                // finalize, and no artifacts were written.
                info!("worker {}: job {} cancelled", self.worker_id, job_id);
            }
            _ => {
                let (code, message) = outcome
                    .error
                    .as_ref()
                    .map(|e| (e.code.as_str(), e.message.as_str()))
                    .unwrap_or(("INTERNAL", "job failed without a recorded error"));
                self.store.fail(job_id, code, message, Some(outcome.manifest)).await?;
            }
        }
        Ok(true)
    }
}
