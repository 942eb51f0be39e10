//! PDF renderer – takes a [`DocumentPlan`] and the raster it was computed
//! for and produces PDF bytes using `printpdf` (v0.8 ops-based API).

use printpdf::*;

use crate::error::RenderError;
use crate::layout_config::{DocumentPlan, PagePlacement};
use crate::raster::RasterImage;

const PT_PER_MM: f32 = 72.0 / 25.4;

/// Render every page of `plan` into PDF bytes.
///
/// Each page carries exactly one image XObject: the raster band named by its
/// placement, scaled to the placement's size.
pub fn render_pdf(plan: &DocumentPlan, raster: &RasterImage) -> Result<Vec<u8>, RenderError> {
    if plan.source_width_px != raster.width() || plan.source_height_px != raster.height() {
        return Err(RenderError::Pdf(format!(
            "plan was computed for {}x{} px, raster is {}x{} px",
            plan.source_width_px,
            plan.source_height_px,
            raster.width(),
            raster.height()
        )));
    }

    let page_w = Mm(plan.page_width_mm);
    let page_h = Mm(plan.page_height_mm);
    let mut doc = PdfDocument::new(&plan.title);
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();

    let mut pages = Vec::with_capacity(plan.pages.len());
    for placement in &plan.pages {
        let png = raster.rows_png(placement.source_top_px, placement.source_height_px)?;
        let raw = RawImage::decode_from_bytes(&png, &mut warnings).map_err(|e| {
            RenderError::Pdf(format!("page {}: {e}", placement.page_index + 1))
        })?;
        let xobj_id = doc.add_image(&raw);
        let ops = vec![place_band(xobj_id, placement, raster.width(), plan.page_height_mm)];
        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        log::debug!("printpdf reported {} warning(s)", warnings.len());
    }
    Ok(bytes)
}

fn place_band(id: XObjectId, placement: &PagePlacement, px_width: u32, page_height_mm: f32) -> Op {
    // PDF origin is bottom-left; placements are measured from the top.
    let width_pt = placement.width_mm * PT_PER_MM;
    let height_pt = placement.height_mm * PT_PER_MM;
    let bottom_pt = (page_height_mm - placement.y_mm) * PT_PER_MM - height_pt;

    // At 72 dpi one image pixel is one point before scaling.
    let scale_x = width_pt / px_width.max(1) as f32;
    let scale_y = height_pt / placement.source_height_px.max(1) as f32;

    Op::UseXobject {
        id,
        transform: XObjectTransform {
            translate_x: Some(Pt(placement.x_mm * PT_PER_MM)),
            translate_y: Some(Pt(bottom_pt)),
            dpi: Some(72.0),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            rotate: None,
        },
    }
}
