//! Shared helpers for the integration tests.
#![allow(dead_code)]

use gangsheet::jobs::JobSpec;
use gangsheet::model::{Machine, MarginSettings, PackMode, ResolvedItem, SizedItem, SizingProfile};

/// A valid 1x1 RGBA PNG with full transparency. The placement geometry
/// comes from the item metadata, so a single pixel is enough for rendering.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15,
    0xC4, 0x89, //
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, // IDAT
    0x78, 0xDA, 0x63, 0x64, 0x60, 0xF8, 0x5F, 0x0F, 0x00, 0x02, 0x87, 0x01, 0x80, 0xEB, 0x47,
    0xBA, 0x92, //
    0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82, // IEND
];

pub fn machine() -> Machine {
    Machine { usable_width_mm: 600.0, max_length_mm: 2500.0, min_dpi: 300.0 }
}

/// Item whose default-profile sizing lands on exactly `w x h` millimeters:
/// pixel dimensions are chosen so the aspect gives `h` at a 100 mm target.
pub fn item_sizing_to(id: u64, position: u32, w_mm: f64, h_mm: f64) -> ResolvedItem {
    ResolvedItem {
        id,
        sku: format!("sku-{id}"),
        quantity: 1,
        picklist_position: position,
        artwork_width_px: (w_mm * 10.0).round() as u32,
        artwork_height_px: (h_mm * 10.0).round() as u32,
        artwork_dpi: 300.0,
        artwork_format: "png".to_string(),
        artwork_handle: format!("tenant/7/assets/{id}.png"),
    }
}

/// A profile set whose default maps any SKU to a target width equal to the
/// raw projection of `item_sizing_to` items, keeping their mm size intact.
pub fn identity_profiles(target_width_mm: f64) -> Vec<SizingProfile> {
    vec![SizingProfile { sku_prefix: None, target_width_mm, is_default: true }]
}

/// A sized item fabricated directly, bypassing the sizing engine.
pub fn sized(id: u64, position: u32, w: f64, h: f64) -> SizedItem {
    SizedItem {
        item: item_sizing_to(id, position, w, h),
        final_width_mm: w,
        final_height_mm: h,
        scale_applied: 1.0,
        warnings: Vec::new(),
    }
}

pub fn job_spec(items: Vec<ResolvedItem>, mode: PackMode, target_width_mm: f64) -> JobSpec {
    JobSpec {
        tenant_id: 7,
        mode,
        allow_rotate: false,
        reproducible: true,
        machine: machine(),
        margins: MarginSettings::default(),
        profiles: identity_profiles(target_width_mm),
        items,
    }
}
