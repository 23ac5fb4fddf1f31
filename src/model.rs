// src/model.rs
//! Input contract of the composition core: the machine, the tenant's sizing
//! profiles and the resolved picklist items handed over by upstream
//! resolution. Everything here is immutable for the duration of a job.

use serde::{Deserialize, Serialize};

/// Print machine constraints, fixed per job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Machine {
    /// Usable media width in millimeters.
    pub usable_width_mm: f64,
    /// Hard cap on the length of a single base.
    pub max_length_mm: f64,
    /// Lower bound for the DPI of any placed artwork.
    pub min_dpi: f64,
}

/// Margin constants, configurable per tenant but constant within a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginSettings {
    /// Margin kept clear along every edge of a base.
    pub side_mm: f64,
    /// Minimum spacing between neighbouring items, for cutting.
    pub inter_item_mm: f64,
}

impl Default for MarginSettings {
    fn default() -> Self {
        Self { side_mm: 20.0, inter_item_mm: 10.0 }
    }
}

/// Maps a SKU prefix to a target print width. At most one profile per tenant
/// carries `is_default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingProfile {
    #[serde(default)]
    pub sku_prefix: Option<String>,
    pub target_width_mm: f64,
    #[serde(default)]
    pub is_default: bool,
}

/// Packing strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackMode {
    /// Strict picklist order.
    #[default]
    Sequence,
    /// Area-descending reorder for higher utilization.
    Optimize,
}

impl std::fmt::Display for PackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackMode::Sequence => write!(f, "sequence"),
            PackMode::Optimize => write!(f, "optimize"),
        }
    }
}

/// One picklist line after upstream resolution. Quantities are expanded
/// before the core runs, so every item arrives with `quantity = 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub id: u64,
    /// Normalized SKU.
    pub sku: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// 1-based index preserving the picklist reading order.
    pub picklist_position: u32,
    pub artwork_width_px: u32,
    pub artwork_height_px: u32,
    pub artwork_dpi: f64,
    /// Raster format as reported by the asset metadata, e.g. "png".
    pub artwork_format: String,
    /// Opaque storage reference the renderer reads the raster from.
    pub artwork_handle: String,
}

fn default_quantity() -> u32 {
    1
}

/// A non-fatal observation made while sizing an item; accumulated onto the
/// manifest in picklist order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingWarning {
    pub item_id: u64,
    pub sku: String,
    pub code: String,
    pub message: String,
}

/// A resolved item projected into final print dimensions.
#[derive(Debug, Clone)]
pub struct SizedItem {
    pub item: ResolvedItem,
    pub final_width_mm: f64,
    pub final_height_mm: f64,
    /// Ratio of the final width to the raw mm projection at the artwork's
    /// DPI; 1.0 when the target width equals the raw projection.
    pub scale_applied: f64,
    pub warnings: Vec<SizingWarning>,
}

impl SizedItem {
    pub fn area_mm2(&self) -> f64 {
        self.final_width_mm * self.final_height_mm
    }

    pub fn aspect(&self) -> f64 {
        self.final_width_mm / self.final_height_mm
    }
}
