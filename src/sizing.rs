// src/sizing.rs
//! Sizing engine: projects raw artwork into target print dimensions under
//! machine constraints. Profile selection matches the longest normalized SKU
//! prefix, falling back to the tenant's default profile.

use crate::geom::{le, EPSILON_MM};
use crate::model::{Machine, MarginSettings, ResolvedItem, SizedItem, SizingProfile, SizingWarning};
use log::{debug, warn};
use thiserror::Error;

/// Millimeters per inch, for the px→mm projection.
const MM_PER_INCH: f64 = 25.4;

/// Per-item sizing failure. Any one of these poisons the whole job; the
/// pipeline driver aggregates them before finalizing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizingError {
    #[error("no sizing profile matches SKU '{sku}' and no default profile exists")]
    NoProfile { sku: String },

    #[error("artwork DPI {dpi} is below the machine minimum of {min_dpi}")]
    LowDpi { dpi: f64, min_dpi: f64 },

    #[error("unsupported artwork format '{format}' (supported: png, jpeg)")]
    UnsupportedFormat { format: String },

    #[error("sized height {height_mm:.2}mm plus margins exceeds the machine maximum length of {max_length_mm:.2}mm")]
    ItemExceedsMaxLength { height_mm: f64, max_length_mm: f64 },
}

impl SizingError {
    /// Stable machine-readable code persisted on the job record.
    pub fn code(&self) -> &'static str {
        match self {
            SizingError::NoProfile { .. } => "NO_PROFILE",
            SizingError::LowDpi { .. } => "LOW_DPI",
            SizingError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            SizingError::ItemExceedsMaxLength { .. } => "ITEM_EXCEEDS_MAX_LENGTH",
        }
    }
}

/// A sizing failure tied back to the item that caused it.
#[derive(Debug, Clone)]
pub struct SizingFailure {
    pub item_id: u64,
    pub sku: String,
    pub picklist_position: u32,
    pub error: SizingError,
}

/// Normalize a SKU or prefix for matching: lowercase, with separators
/// stripped. Must mirror the normalization used by upstream resolution.
pub fn normalize_sku(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Sizing engine for one job. Holds a snapshot of the tenant's profile set
/// taken at job start, so mid-job profile edits cannot affect results.
pub struct SizingEngine {
    machine: Machine,
    margins: MarginSettings,
    /// `(normalized_prefix, target_width_mm)`, longest prefix first.
    prefixes: Vec<(String, f64)>,
    default_target_mm: Option<f64>,
}

impl SizingEngine {
    pub fn new(machine: Machine, margins: MarginSettings, profiles: &[SizingProfile]) -> Self {
        let mut prefixes: Vec<(String, f64)> = profiles
            .iter()
            .filter_map(|p| {
                p.sku_prefix
                    .as_deref()
                    .map(|prefix| (normalize_sku(prefix), p.target_width_mm))
            })
            .filter(|(prefix, _)| !prefix.is_empty())
            .collect();
        // Longer prefixes take precedence; sort once instead of per item.
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let default_target_mm = profiles.iter().find(|p| p.is_default).map(|p| p.target_width_mm);

        Self { machine, margins, prefixes, default_target_mm }
    }

    /// Width actually available to an item once side margins are reserved.
    pub fn usable_margin_width_mm(&self) -> f64 {
        self.machine.usable_width_mm - 2.0 * self.margins.side_mm
    }

    /// Select the target width for a SKU: longest matching prefix, then the
    /// default profile.
    fn target_width_for(&self, sku: &str) -> Result<f64, SizingError> {
        let normalized = normalize_sku(sku);
        for (prefix, target) in &self.prefixes {
            if normalized.starts_with(prefix.as_str()) {
                debug!("SKU '{}' matched sizing prefix '{}' ({}mm)", sku, prefix, target);
                return Ok(*target);
            }
        }
        self.default_target_mm
            .ok_or_else(|| SizingError::NoProfile { sku: sku.to_string() })
    }

    /// Size a single item. Aspect ratio is preserved to floating-point
    /// precision; a width overflow falls back to scale-to-fit.
    pub fn size_item(&self, item: &ResolvedItem) -> Result<SizedItem, SizingError> {
        let format = item.artwork_format.trim().to_ascii_lowercase();
        if !matches!(format.as_str(), "png" | "jpeg" | "jpg") {
            return Err(SizingError::UnsupportedFormat { format: item.artwork_format.clone() });
        }

        if item.artwork_dpi < self.machine.min_dpi {
            return Err(SizingError::LowDpi {
                dpi: item.artwork_dpi,
                min_dpi: self.machine.min_dpi,
            });
        }

        let target_width_mm = self.target_width_for(&item.sku)?;

        let raw_width_mm = item.artwork_width_px as f64 * MM_PER_INCH / item.artwork_dpi;
        let raw_height_mm = item.artwork_height_px as f64 * MM_PER_INCH / item.artwork_dpi;

        let k = target_width_mm / raw_width_mm;
        let mut final_width_mm = target_width_mm;
        let mut final_height_mm = raw_height_mm * k;
        let mut scale_applied = k;
        let mut warnings = Vec::new();

        let usable = self.usable_margin_width_mm();
        if final_width_mm > usable + EPSILON_MM {
            let k_fit = usable / final_width_mm;
            let original_width = final_width_mm;
            final_width_mm = usable;
            final_height_mm *= k_fit;
            scale_applied = k * k_fit;

            let message = format!(
                "scaled to {:.0}% to fit width ({:.1}mm -> {:.1}mm)",
                k_fit * 100.0,
                original_width,
                final_width_mm
            );
            warn!("item {} (SKU: {}): {}", item.id, item.sku, message);
            warnings.push(SizingWarning {
                item_id: item.id,
                sku: item.sku.clone(),
                code: "SCALED_DOWN_TO_FIT_WIDTH".to_string(),
                message,
            });
        }

        if !le(final_height_mm + 2.0 * self.margins.side_mm, self.machine.max_length_mm) {
            return Err(SizingError::ItemExceedsMaxLength {
                height_mm: final_height_mm,
                max_length_mm: self.machine.max_length_mm,
            });
        }

        Ok(SizedItem {
            item: item.clone(),
            final_width_mm,
            final_height_mm,
            scale_applied,
            warnings,
        })
    }

    /// Size every item independently. Failures do not stop the pass; the
    /// caller decides job disposition once all items have been inspected.
    pub fn size_all(&self, items: &[ResolvedItem]) -> (Vec<SizedItem>, Vec<SizingFailure>) {
        let mut sized = Vec::with_capacity(items.len());
        let mut failures = Vec::new();
        for item in items {
            match self.size_item(item) {
                Ok(s) => sized.push(s),
                Err(error) => failures.push(SizingFailure {
                    item_id: item.id,
                    sku: item.sku.clone(),
                    picklist_position: item.picklist_position,
                    error,
                }),
            }
        }
        (sized, failures)
    }
}
