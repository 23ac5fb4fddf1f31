// src/manifest.rs
//! The manifest is the authoritative audit trail of a job: every placement
//! decision, warning and error, in a stable serde-serializable shape.

use crate::model::{Machine, MarginSettings, PackMode, SizingWarning};
use crate::packing::{Base, PackResult, Placement};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured job-level error entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingSummary {
    pub total_items: usize,
    pub valid_items: usize,
    pub invalid_items: usize,
    /// Items that needed the scale-to-fit width fallback.
    pub scaled_items: usize,
    /// Ordered by picklist position.
    pub warnings: Vec<SizingWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub item_id: u64,
    pub sku: String,
    pub picklist_position: u32,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub scale_applied: f64,
    pub rotated: bool,
}

impl From<&Placement> for PlacementRecord {
    fn from(p: &Placement) -> Self {
        Self {
            item_id: p.item_id,
            sku: p.sku.clone(),
            picklist_position: p.picklist_position,
            x_mm: p.x_mm,
            y_mm: p.y_mm,
            width_mm: p.width_mm,
            height_mm: p.height_mm,
            scale_applied: p.scale_applied,
            rotated: p.rotated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseSummary {
    pub index: u32,
    pub width_mm: f64,
    pub length_mm: f64,
    pub utilization: f64,
    pub items_count: usize,
    /// In commit order.
    pub placements: Vec<PlacementRecord>,
}

impl From<&Base> for BaseSummary {
    fn from(base: &Base) -> Self {
        Self {
            index: base.index,
            width_mm: base.width_mm,
            length_mm: base.length_mm,
            utilization: base.utilization,
            items_count: base.placements.len(),
            placements: base.placements.iter().map(PlacementRecord::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingSummary {
    pub mode: PackMode,
    pub total_bases: usize,
    pub total_length_mm: f64,
    pub avg_utilization: f64,
    pub bases: Vec<BaseSummary>,
}

impl From<&PackResult> for PackingSummary {
    fn from(result: &PackResult) -> Self {
        Self {
            mode: result.mode,
            total_bases: result.total_bases(),
            total_length_mm: result.total_length_mm(),
            avg_utilization: result.avg_utilization(),
            bases: result.bases.iter().map(BaseSummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputsSummary {
    /// Storage URIs, one per base, in base order.
    pub artifacts: Vec<String>,
}

/// The full job manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub mode: PackMode,
    pub machine: Machine,
    pub margins: MarginSettings,
    /// Wall-clock seconds; `None` until the job finishes, and suppressed
    /// entirely under the reproducibility flag.
    pub processing_time_seconds: Option<f64>,
    pub sizing: SizingSummary,
    pub packing: PackingSummary,
    pub outputs: OutputsSummary,
    pub errors: Vec<JobError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Manifest {
    /// A manifest for a job that failed before any base was packed.
    pub fn failed(
        mode: PackMode,
        machine: Machine,
        margins: MarginSettings,
        sizing: SizingSummary,
        errors: Vec<JobError>,
    ) -> Self {
        Self {
            mode,
            machine,
            margins,
            processing_time_seconds: None,
            sizing,
            packing: PackingSummary {
                mode,
                total_bases: 0,
                total_length_mm: 0.0,
                avg_utilization: 0.0,
                bases: Vec::new(),
            },
            outputs: OutputsSummary::default(),
            errors,
            completed_at: None,
        }
    }
}
