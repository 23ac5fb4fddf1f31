// src/render/pdf.rs
//! PDF backend. Each base becomes a single-page document whose MediaBox is
//! the exact base size in millimeters; every placement embeds its raster as
//! an image XObject drawn with an affine transform. No text, no cropmarks,
//! no background. Source transparency is kept as-is.

use super::{BaseRenderer, RenderContext, RenderError, SharedData};
use crate::geom::{le, mm_to_pt};
use crate::packing::{Base, Placement};
use log::{debug, warn};
use printpdf::image::RawImage;
use printpdf::ops::Op;
use printpdf::xobject::{XObject, XObjectTransform};
use printpdf::{Mm, PdfDocument, PdfPage, PdfSaveOptions, Pt, XObjectId};
use std::collections::HashMap;

const PRODUCER: &str = concat!("gangsheet ", env!("CARGO_PKG_VERSION"));

/// Print-ready PDF renderer backed by `printpdf`.
#[derive(Debug, Default)]
pub struct PdfBaseRenderer;

impl PdfBaseRenderer {
    pub fn new() -> Self {
        Self
    }

    fn decode_and_register(
        doc: &mut PdfDocument,
        cache: &mut HashMap<String, (XObjectId, (u32, u32))>,
        handle: &str,
        data: &SharedData,
    ) -> Result<(XObjectId, (u32, u32)), RenderError> {
        if let Some(cached) = cache.get(handle) {
            return Ok(cached.clone());
        }

        let mut warnings = Vec::new();
        let raw_image = RawImage::decode_from_bytes(data, &mut warnings).map_err(|e| {
            RenderError::Decode { handle: handle.to_string(), reason: e.to_string() }
        })?;
        for w in &warnings {
            debug!("decode warning for '{}': {:?}", handle, w);
        }

        let dims = (raw_image.width as u32, raw_image.height as u32);
        // Stable ids keep the output byte-reproducible; the default
        // constructor would mint a random name per run.
        let xobj_id = XObjectId(format!("Im{}", cache.len() + 1));
        doc.resources.xobjects.map.insert(xobj_id.clone(), XObject::Image(raw_image));
        cache.insert(handle.to_string(), (xobj_id.clone(), dims));
        Ok((xobj_id, dims))
    }

    /// Boundary re-validation before any drawing happens. The packer already
    /// guarantees this; a violation here means corrupted state and fails the
    /// whole job rather than emitting a bad sheet.
    fn validate_placement(base: &Base, p: &Placement) -> Result<(), RenderError> {
        let in_bounds = p.x_mm >= 0.0
            && p.y_mm >= 0.0
            && le(p.x_mm + p.width_mm, base.width_mm)
            && le(p.y_mm + p.height_mm, base.length_mm);
        if in_bounds {
            Ok(())
        } else {
            Err(RenderError::PlacementOutOfBounds {
                item_id: p.item_id,
                base_index: base.index,
                x_mm: p.x_mm,
                y_mm: p.y_mm,
            })
        }
    }
}

impl BaseRenderer for PdfBaseRenderer {
    fn render_base(
        &self,
        base: &Base,
        artwork: &HashMap<String, SharedData>,
        ctx: &RenderContext,
    ) -> Result<Vec<u8>, RenderError> {
        let title = format!("Base {} - Job {}", base.index, ctx.job_id);
        let mut doc = PdfDocument::new(&title);
        doc.metadata.info.creator = PRODUCER.to_string();
        doc.metadata.info.producer = PRODUCER.to_string();
        doc.metadata.info.subject = format!("Print job {}", ctx.job_id);
        if ctx.reproducible {
            doc.metadata.info.creation_date = printpdf::OffsetDateTime::epoch();
            doc.metadata.info.modification_date = printpdf::OffsetDateTime::epoch();
            doc.metadata.info.metadata_date = printpdf::OffsetDateTime::epoch();
            doc.metadata.info.identifier = format!("{}-base-{}", ctx.job_id, base.index);
        }

        let page_height_pt = mm_to_pt(base.length_mm);
        let mut cache: HashMap<String, (XObjectId, (u32, u32))> = HashMap::new();
        let mut ops: Vec<Op> = Vec::with_capacity(base.placements.len());

        for placement in &base.placements {
            Self::validate_placement(base, placement)?;

            let data = artwork
                .get(&placement.artwork_handle)
                .ok_or_else(|| RenderError::MissingArtwork(placement.artwork_handle.clone()))?;
            let (xobj_id, (img_w, img_h)) =
                Self::decode_and_register(&mut doc, &mut cache, &placement.artwork_handle, data)?;

            // Top-left mm coordinates to bottom-left PDF points.
            let x_pt = mm_to_pt(placement.x_mm);
            let y_pt = page_height_pt - mm_to_pt(placement.y_mm + placement.height_mm);
            let transform = XObjectTransform {
                translate_x: Some(Pt(x_pt)),
                translate_y: Some(Pt(y_pt)),
                scale_x: Some(mm_to_pt(placement.width_mm) / img_w as f32),
                scale_y: Some(mm_to_pt(placement.height_mm) / img_h as f32),
                rotate: None,
                dpi: Some(72.0),
            };
            ops.push(Op::UseXobject { id: xobj_id, transform });

            debug!(
                "drew item {} (SKU: {}) at ({:.1}, {:.1})mm, {:.1}x{:.1}mm",
                placement.item_id,
                placement.sku,
                placement.x_mm,
                placement.y_mm,
                placement.width_mm,
                placement.height_mm
            );
        }

        let page = PdfPage::new(Mm(base.width_mm as f32), Mm(base.length_mm as f32), ops);
        doc.pages.push(page);

        let mut buffer: Vec<u8> = Vec::with_capacity(16 * 1024);
        let save_options = PdfSaveOptions::default();
        let mut warnings = Vec::new();
        doc.save_writer(&mut buffer, &save_options, &mut warnings);
        if !warnings.is_empty() {
            warn!("printpdf produced {} warning(s) while saving base {}", warnings.len(), base.index);
        }

        debug!(
            "rendered base {}: {:.0}x{:.0}mm, {} placement(s), {} bytes",
            base.index,
            base.width_mm,
            base.length_mm,
            base.placements.len(),
            buffer.len()
        );
        Ok(buffer)
    }

    fn file_extension(&self) -> &'static str {
        "pdf"
    }
}
