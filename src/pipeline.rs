// src/pipeline.rs
//! Pipeline driver: sizing → packing → rendering → artifact writes →
//! manifest, strictly in that order. Geometry stages are synchronous; only
//! storage access suspends. Failures never cross the boundary as panics or
//! raw errors — every run produces a [`JobOutcome`] with a disposition.

use crate::error::PipelineError;
use crate::jobs::models::{ItemOutcome, JobSpec, JobStatus};
use crate::manifest::{JobError, Manifest, OutputsSummary, PackingSummary, SizingSummary};
use crate::model::SizedItem;
use crate::packing::{PackResult, Packer};
use crate::render::{BaseRenderer, PdfBaseRenderer, RenderContext, SharedData};
use crate::sizing::{SizingEngine, SizingFailure};
use crate::storage::{RetryPolicy, Storage, StorageClient};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default soft deadline per job.
pub const DEFAULT_SOFT_DEADLINE: Duration = Duration::from_secs(300);

/// Cooperative cancellation signal, observed between stages and between
/// bases. In-flight geometry is never interrupted.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives coarse progress updates at stage boundaries.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: u8, message: &str);
}

/// Sink that drops all updates.
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn report(&self, _progress: u8, _message: &str) {}
}

/// Per-run control handles.
#[derive(Clone)]
pub struct JobControl {
    pub cancel: CancelFlag,
    pub progress: Arc<dyn ProgressSink>,
}

impl JobControl {
    pub fn noop() -> Self {
        Self { cancel: CancelFlag::new(), progress: Arc::new(NoProgress) }
    }
}

/// Terminal result of one pipeline run.
#[derive(Debug)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub manifest: Manifest,
    pub item_outcomes: Vec<ItemOutcome>,
    /// Primary error for failed jobs; `None` on success.
    pub error: Option<JobError>,
}

pub struct PipelineBuilder {
    storage: Option<Arc<dyn Storage>>,
    renderer: Arc<dyn BaseRenderer>,
    retry_policy: RetryPolicy,
    soft_deadline: Duration,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            storage: None,
            renderer: Arc::new(PdfBaseRenderer::new()),
            retry_policy: RetryPolicy::default(),
            soft_deadline: DEFAULT_SOFT_DEADLINE,
        }
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn BaseRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_soft_deadline(mut self, deadline: Duration) -> Self {
        self.soft_deadline = deadline;
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let storage = self
            .storage
            .ok_or_else(|| PipelineError::Spec("no storage backend configured".to_string()))?;
        Ok(Pipeline {
            storage: StorageClient::new(storage, self.retry_policy),
            renderer: self.renderer,
            soft_deadline: self.soft_deadline,
        })
    }
}

pub struct Pipeline {
    storage: StorageClient,
    renderer: Arc<dyn BaseRenderer>,
    soft_deadline: Duration,
}

impl Pipeline {
    /// Run one job to its terminal disposition. Either every base's artifact
    /// is written or none is.
    pub async fn run(&self, job_id: Uuid, spec: &JobSpec, ctl: &JobControl) -> JobOutcome {
        let started = Instant::now();
        info!(
            "job {}: {} item(s), mode {}, machine {:.0}x{:.0}mm",
            job_id,
            spec.items.len(),
            spec.mode,
            spec.machine.usable_width_mm,
            spec.machine.max_length_mm
        );
        if spec.allow_rotate {
            debug!("job {}: allow_rotate requested; rotation is not applied in this engine", job_id);
        }

        // Stage 1: sizing. Every item is inspected even after a failure so
        // the operator sees the complete picture.
        ctl.progress.report(10, "sizing items").await;
        let engine = SizingEngine::new(spec.machine, spec.margins, &spec.profiles);
        let (sized, failures) = engine.size_all(&spec.items);
        let sizing_summary = summarize_sizing(spec.items.len(), &sized, &failures);

        if !failures.is_empty() {
            let errors: Vec<JobError> = failures
                .iter()
                .map(|f| JobError {
                    code: f.error.code().to_string(),
                    message: f.error.to_string(),
                    item_id: Some(f.item_id),
                })
                .collect();
            let primary = errors[0].clone();
            warn!("job {}: {} invalid item(s), failing", job_id, failures.len());
            return JobOutcome {
                status: JobStatus::Failed,
                manifest: Manifest::failed(spec.mode, spec.machine, spec.margins, sizing_summary, errors),
                item_outcomes: Vec::new(),
                error: Some(primary),
            };
        }

        if let Err(e) = self.check_interrupt(started, ctl) {
            return self.aborted(spec, sizing_summary, e);
        }

        // Stage 2: packing. Pure geometry, strictly serial.
        ctl.progress.report(40, "packing items onto bases").await;
        let packer = Packer::new(spec.machine, spec.margins);
        let pack_result = match packer.pack(&sized, spec.mode) {
            Ok(result) => result,
            Err(e) => {
                let error = JobError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    item_id: None,
                };
                return JobOutcome {
                    status: JobStatus::Failed,
                    manifest: Manifest::failed(
                        spec.mode,
                        spec.machine,
                        spec.margins,
                        sizing_summary,
                        vec![error.clone()],
                    ),
                    item_outcomes: Vec::new(),
                    error: Some(error),
                };
            }
        };

        if let Err(e) = self.check_interrupt(started, ctl) {
            return self.aborted(spec, sizing_summary, e);
        }

        // Stage 3: rendering. Artwork is fetched once per distinct handle,
        // then every base renders in order; nothing is written until all of
        // them succeeded, so a failed job leaves no artifacts behind.
        ctl.progress.report(60, "rendering bases").await;
        let render_ctx =
            RenderContext { job_id: job_id.to_string(), reproducible: spec.reproducible };
        let rendered = match self
            .render_all(started, ctl, &pack_result, &render_ctx)
            .await
        {
            Ok(rendered) => rendered,
            Err(e) => return self.aborted(spec, sizing_summary, e),
        };

        ctl.progress.report(85, "writing artifacts").await;
        let artifacts = match self.write_all(spec, job_id, rendered).await {
            Ok(uris) => uris,
            Err(e) => return self.aborted(spec, sizing_summary, e),
        };

        // Stage 4: manifest.
        let item_outcomes = collect_item_outcomes(&sized, &pack_result);
        let manifest = Manifest {
            mode: spec.mode,
            machine: spec.machine,
            margins: spec.margins,
            processing_time_seconds: if spec.reproducible {
                None
            } else {
                Some(started.elapsed().as_secs_f64())
            },
            sizing: sizing_summary,
            packing: PackingSummary::from(&pack_result),
            outputs: OutputsSummary { artifacts },
            errors: Vec::new(),
            completed_at: if spec.reproducible { None } else { Some(Utc::now()) },
        };
        ctl.progress.report(100, "completed").await;
        info!(
            "job {} completed: {} base(s), {:.1}% avg utilization, {:.2}s",
            job_id,
            pack_result.total_bases(),
            pack_result.avg_utilization() * 100.0,
            started.elapsed().as_secs_f64()
        );

        JobOutcome {
            status: JobStatus::Completed,
            manifest,
            item_outcomes,
            error: None,
        }
    }

    async fn render_all(
        &self,
        started: Instant,
        ctl: &JobControl,
        pack_result: &PackResult,
        render_ctx: &RenderContext,
    ) -> Result<Vec<Vec<u8>>, PipelineError> {
        let mut artwork: HashMap<String, SharedData> = HashMap::new();
        for base in &pack_result.bases {
            for placement in &base.placements {
                if !artwork.contains_key(&placement.artwork_handle) {
                    let data = self.storage.read(&placement.artwork_handle).await?;
                    artwork.insert(placement.artwork_handle.clone(), data);
                }
            }
        }

        let mut rendered = Vec::with_capacity(pack_result.bases.len());
        for base in &pack_result.bases {
            self.check_interrupt(started, ctl)?;
            let bytes = self.renderer.render_base(base, &artwork, render_ctx)?;
            rendered.push(bytes);
        }
        Ok(rendered)
    }

    async fn write_all(
        &self,
        spec: &JobSpec,
        job_id: Uuid,
        rendered: Vec<Vec<u8>>,
    ) -> Result<Vec<String>, PipelineError> {
        let ext = self.renderer.file_extension();
        let mut written: Vec<String> = Vec::with_capacity(rendered.len());
        for (i, bytes) in rendered.iter().enumerate() {
            let path = format!(
                "tenant/{}/outputs/{}/base_{}.{}",
                spec.tenant_id,
                job_id,
                i + 1,
                ext
            );
            match self.storage.write(&path, bytes).await {
                Ok(uri) => written.push(uri),
                Err(e) => {
                    // No partial success: roll back whatever landed.
                    for uri in &written {
                        if let Err(cleanup) = self.storage.delete(uri).await {
                            warn!("cleanup of '{}' failed: {}", uri, cleanup);
                        }
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(written)
    }

    fn check_interrupt(&self, started: Instant, ctl: &JobControl) -> Result<(), PipelineError> {
        if ctl.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        if started.elapsed() > self.soft_deadline {
            return Err(PipelineError::Timeout(self.soft_deadline));
        }
        Ok(())
    }

    /// Terminal outcome for a run interrupted by a stage-level error,
    /// timeout or cancellation.
    fn aborted(
        &self,
        spec: &JobSpec,
        sizing_summary: SizingSummary,
        e: PipelineError,
    ) -> JobOutcome {
        let status = match e {
            PipelineError::Cancelled => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        };
        let error = JobError { code: e.code().to_string(), message: e.to_string(), item_id: None };
        JobOutcome {
            status,
            manifest: Manifest::failed(
                spec.mode,
                spec.machine,
                spec.margins,
                sizing_summary,
                vec![error.clone()],
            ),
            item_outcomes: Vec::new(),
            error: Some(error),
        }
    }
}

fn summarize_sizing(
    total_items: usize,
    sized: &[SizedItem],
    failures: &[SizingFailure],
) -> SizingSummary {
    let mut warnings: Vec<_> = sized.iter().flat_map(|s| s.warnings.iter().cloned()).collect();
    // Items are sized in input order, but the audit trail is specified to be
    // ordered by picklist position.
    let position_of: HashMap<u64, u32> =
        sized.iter().map(|s| (s.item.id, s.item.picklist_position)).collect();
    warnings.sort_by_key(|w| position_of.get(&w.item_id).copied().unwrap_or(u32::MAX));

    SizingSummary {
        total_items,
        valid_items: sized.len(),
        invalid_items: failures.len(),
        scaled_items: sized.iter().filter(|s| !s.warnings.is_empty()).count(),
        warnings,
    }
}

fn collect_item_outcomes(sized: &[SizedItem], pack_result: &PackResult) -> Vec<ItemOutcome> {
    let by_id: HashMap<u64, &SizedItem> = sized.iter().map(|s| (s.item.id, s)).collect();
    let mut outcomes = Vec::with_capacity(sized.len());
    for base in &pack_result.bases {
        for p in &base.placements {
            if let Some(s) = by_id.get(&p.item_id) {
                outcomes.push(ItemOutcome {
                    item_id: p.item_id,
                    final_width_mm: s.final_width_mm,
                    final_height_mm: s.final_height_mm,
                    scale_applied: s.scale_applied,
                    base_index: base.index,
                    x_mm: p.x_mm,
                    y_mm: p.y_mm,
                });
            }
        }
    }
    outcomes.sort_by_key(|o| o.item_id);
    outcomes
}
