// src/jobs/models.rs

use crate::manifest::Manifest;
use crate::model::{Machine, MarginSettings, PackMode, ResolvedItem, SizingProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the core needs to run one composition job. Upstream
/// resolution has already expanded quantities and attached artwork handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub tenant_id: u64,
    #[serde(default)]
    pub mode: PackMode,
    /// Accepted for forward compatibility; the current engine never rotates.
    #[serde(default)]
    pub allow_rotate: bool,
    /// Pin volatile metadata for byte-reproducible output.
    #[serde(default)]
    pub reproducible: bool,
    pub machine: Machine,
    #[serde(default)]
    pub margins: MarginSettings,
    pub profiles: Vec<SizingProfile>,
    pub items: Vec<ResolvedItem>,
}

/// Job lifecycle states. The core only ever produces `Completed` or
/// `Failed`; `NeedsInput` comes from upstream resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    NeedsInput,
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::NeedsInput => "needs_input",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "needs_input" => Ok(JobStatus::NeedsInput),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(format!("invalid job status: {s}")),
        }
    }
}

/// Final geometry written back for one item once its base is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_id: u64,
    pub final_width_mm: f64,
    pub final_height_mm: f64,
    pub scale_applied: f64,
    pub base_index: u32,
    pub x_mm: f64,
    pub y_mm: f64,
}

/// One job as tracked by the job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub tenant_id: u64,
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub manifest: Option<Manifest>,
    pub item_outcomes: Vec<ItemOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
