// src/render/mod.rs
//! Base renderers: turn a finalized base plus its artwork rasters into one
//! print-ready artifact. The output format is pluggable behind a trait; the
//! shipped backend produces PDF.

mod pdf;

pub use pdf::PdfBaseRenderer;

use crate::packing::Base;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Immutable binary resource shared between pipeline stages.
pub type SharedData = Arc<Vec<u8>>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode artwork '{handle}': {reason}")]
    Decode { handle: String, reason: String },

    #[error("artwork '{0}' was not loaded before rendering")]
    MissingArtwork(String),

    #[error("placement of item {item_id} at ({x_mm:.2}, {y_mm:.2}mm) lies outside base {base_index}")]
    PlacementOutOfBounds { item_id: u64, base_index: u32, x_mm: f64, y_mm: f64 },

    #[error("PDF generation error: {0}")]
    Pdf(String),
}

impl RenderError {
    pub fn code(&self) -> &'static str {
        "RENDER_FAIL"
    }
}

/// Job-level context a renderer may stamp into artifact metadata.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub job_id: String,
    /// Pin all volatile metadata (timestamps) so two renders of the same
    /// inputs are byte-identical.
    pub reproducible: bool,
}

/// Renders one finalized base. Artwork bytes are pre-loaded by the pipeline
/// driver and handed over keyed by the placement's artwork handle.
pub trait BaseRenderer: Send + Sync {
    fn render_base(
        &self,
        base: &Base,
        artwork: &HashMap<String, SharedData>,
        ctx: &RenderContext,
    ) -> Result<Vec<u8>, RenderError>;

    /// File extension of the produced artifact, without the dot.
    fn file_extension(&self) -> &'static str;
}
