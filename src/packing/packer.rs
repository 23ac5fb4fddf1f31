// src/packing/packer.rs
//! Packing engine: places sized items onto fixed-width bases using the
//! skyline's lowest-placement rule. The `sequence` and `optimize` strategies
//! differ only in the pre-ordering pass; the per-base loop is shared.

use crate::geom::Rect;
use crate::model::{Machine, MarginSettings, PackMode, SizedItem};
use crate::packing::skyline::Skyline;
use log::{debug, error, info};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PackError {
    #[error("item {item_id} (SKU: {sku}, {width_mm:.1}x{height_mm:.1}mm) does not fit on an empty base")]
    ItemExceedsBase { item_id: u64, sku: String, width_mm: f64, height_mm: f64 },

    #[error("collision failsafe fired for item {item_id} (SKU: {sku}) at ({x_mm:.2}, {y_mm:.2}mm) and base rollover could not recover; skyline: {skyline}")]
    InternalCollision { item_id: u64, sku: String, x_mm: f64, y_mm: f64, skyline: String },
}

impl PackError {
    pub fn code(&self) -> &'static str {
        match self {
            PackError::ItemExceedsBase { .. } => "ITEM_EXCEEDS_BASE",
            PackError::InternalCollision { .. } => "INTERNAL_COLLISION",
        }
    }
}

/// One item committed onto one base, at exact millimeter coordinates
/// inclusive of side margins. Margins are never part of the rectangle.
#[derive(Debug, Clone)]
pub struct Placement {
    pub item_id: u64,
    pub sku: String,
    pub picklist_position: u32,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub scale_applied: f64,
    pub rotated: bool,
    /// Storage reference of the artwork raster, carried for the renderer.
    pub artwork_handle: String,
}

impl Placement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x_mm, self.y_mm, self.width_mm, self.height_mm)
    }
}

/// A finalized base. Its skyline has been discarded; the placement set is
/// immutable from here on.
#[derive(Debug, Clone)]
pub struct Base {
    /// 1-based, monotonically increasing within a job.
    pub index: u32,
    pub width_mm: f64,
    /// Content extent below the top margin line.
    pub content_length_mm: f64,
    /// Physical length of the rendered artifact.
    pub length_mm: f64,
    /// Placed-item area over base area, in `[0, 1]`.
    pub utilization: f64,
    pub placements: Vec<Placement>,
}

/// Result of packing one job's items.
#[derive(Debug, Clone)]
pub struct PackResult {
    pub mode: PackMode,
    pub bases: Vec<Base>,
}

impl PackResult {
    pub fn total_bases(&self) -> usize {
        self.bases.len()
    }

    pub fn total_length_mm(&self) -> f64 {
        self.bases.iter().map(|b| b.length_mm).sum()
    }

    pub fn avg_utilization(&self) -> f64 {
        if self.bases.is_empty() {
            return 0.0;
        }
        self.bases.iter().map(|b| b.utilization).sum::<f64>() / self.bases.len() as f64
    }

    pub fn placement_count(&self) -> usize {
        self.bases.iter().map(|b| b.placements.len()).sum()
    }
}

enum PlaceOutcome {
    Placed,
    NoFit,
    /// The paranoid re-verification found an overlap the skyline missed.
    Collision { x_mm: f64, y_mm: f64 },
}

/// A base still accepting placements, together with its skyline.
struct OpenBase {
    index: u32,
    width_mm: f64,
    placements: Vec<Placement>,
    skyline: Skyline,
}

impl OpenBase {
    fn new(index: u32, machine: &Machine, margins: &MarginSettings) -> Self {
        Self {
            index,
            width_mm: machine.usable_width_mm,
            placements: Vec::new(),
            skyline: Skyline::new(machine.usable_width_mm, margins.side_mm),
        }
    }

    fn try_place(
        &mut self,
        item: &SizedItem,
        machine: &Machine,
        margins: &MarginSettings,
    ) -> PlaceOutcome {
        let w = item.final_width_mm;
        let h = item.final_height_mm;

        let Some(candidate) =
            self.skyline.find_lowest(w, h, machine.max_length_mm, margins.side_mm)
        else {
            return PlaceOutcome::NoFit;
        };

        // Invariant-preserving failsafe: re-verify against the real
        // placement set before trusting the skyline.
        let inflated = Rect::new(candidate.x, candidate.y, w, h).inflate(margins.inter_item_mm / 2.0);
        for existing in &self.placements {
            if inflated.intersects(&existing.rect().inflate(margins.inter_item_mm / 2.0)) {
                error!(
                    "collision detected on base {} for item {} at ({:.2}, {:.2})",
                    self.index, item.item.id, candidate.x, candidate.y
                );
                return PlaceOutcome::Collision { x_mm: candidate.x, y_mm: candidate.y };
            }
        }

        self.skyline.commit(
            candidate.x,
            w,
            candidate.y + h + margins.inter_item_mm,
            margins.inter_item_mm,
        );
        self.placements.push(Placement {
            item_id: item.item.id,
            sku: item.item.sku.clone(),
            picklist_position: item.item.picklist_position,
            x_mm: candidate.x,
            y_mm: candidate.y,
            width_mm: w,
            height_mm: h,
            scale_applied: item.scale_applied,
            rotated: false,
            artwork_handle: item.item.artwork_handle.clone(),
        });
        debug!(
            "placed item {} on base {} at ({:.1}, {:.1})mm",
            item.item.id, self.index, candidate.x, candidate.y
        );
        PlaceOutcome::Placed
    }

    fn finalize(self, margins: &MarginSettings) -> Base {
        let content_bottom = self
            .placements
            .iter()
            .map(|p| p.y_mm + p.height_mm)
            .fold(margins.side_mm, f64::max);
        let content_length_mm = content_bottom - margins.side_mm;
        let length_mm = content_length_mm + margins.side_mm;

        let used_area: f64 = self.placements.iter().map(|p| p.rect().area()).sum();
        let base_area = self.width_mm * length_mm;
        let utilization = if base_area > 0.0 { used_area / base_area } else { 0.0 };

        info!(
            "base {}: {} item(s), {:.1}mm long, {:.1}% utilization",
            self.index,
            self.placements.len(),
            length_mm,
            utilization * 100.0
        );

        Base {
            index: self.index,
            width_mm: self.width_mm,
            content_length_mm,
            length_mm,
            utilization,
            placements: self.placements,
        }
    }
}

/// Order items for packing. Sequence keeps strict picklist order; optimize
/// reorders by descending area, breaking ties by descending height and then
/// ascending picklist position for stability.
fn preorder<'a>(items: &'a [SizedItem], mode: PackMode) -> Vec<&'a SizedItem> {
    let mut ordered: Vec<&SizedItem> = items.iter().collect();
    match mode {
        PackMode::Sequence => {
            ordered.sort_by_key(|s| s.item.picklist_position);
        }
        PackMode::Optimize => {
            ordered.sort_by(|a, b| {
                b.area_mm2()
                    .total_cmp(&a.area_mm2())
                    .then(b.final_height_mm.total_cmp(&a.final_height_mm))
                    .then(a.item.picklist_position.cmp(&b.item.picklist_position))
            });
        }
    }
    ordered
}

/// Stateless packing engine; all per-job state lives on the open base.
pub struct Packer {
    machine: Machine,
    margins: MarginSettings,
}

impl Packer {
    pub fn new(machine: Machine, margins: MarginSettings) -> Self {
        Self { machine, margins }
    }

    /// Pack all items, emitting bases strictly in order. An item that fails
    /// to fit rolls the current base over and is retried exactly once.
    pub fn pack(&self, items: &[SizedItem], mode: PackMode) -> Result<PackResult, PackError> {
        if items.is_empty() {
            return Ok(PackResult { mode, bases: Vec::new() });
        }

        let ordered = preorder(items, mode);
        let mut bases: Vec<Base> = Vec::new();
        let mut current = OpenBase::new(1, &self.machine, &self.margins);

        for item in ordered {
            match current.try_place(item, &self.machine, &self.margins) {
                PlaceOutcome::Placed => continue,
                outcome => {
                    if current.placements.is_empty() {
                        // Nothing to roll over; the item cannot fit at all.
                        return Err(self.unplaceable(item, outcome, &current));
                    }
                    let next_index = current.index + 1;
                    bases.push(current.finalize(&self.margins));
                    current = OpenBase::new(next_index, &self.machine, &self.margins);

                    match current.try_place(item, &self.machine, &self.margins) {
                        PlaceOutcome::Placed => continue,
                        outcome => return Err(self.unplaceable(item, outcome, &current)),
                    }
                }
            }
        }

        if !current.placements.is_empty() {
            bases.push(current.finalize(&self.margins));
        }

        let result = PackResult { mode, bases };
        info!(
            "packing complete: {} item(s) on {} base(s), avg utilization {:.1}%",
            result.placement_count(),
            result.total_bases(),
            result.avg_utilization() * 100.0
        );
        Ok(result)
    }

    fn unplaceable(&self, item: &SizedItem, outcome: PlaceOutcome, base: &OpenBase) -> PackError {
        match outcome {
            PlaceOutcome::Collision { x_mm, y_mm } => PackError::InternalCollision {
                item_id: item.item.id,
                sku: item.item.sku.clone(),
                x_mm,
                y_mm,
                skyline: format!("{:?}", base.skyline.segments()),
            },
            _ => PackError::ItemExceedsBase {
                item_id: item.item.id,
                sku: item.item.sku.clone(),
                width_mm: item.final_width_mm,
                height_mm: item.final_height_mm,
            },
        }
    }
}
