//! Pagination – scales a raster to the page's usable width and slices it
//! into page-sized bands of whole source rows.
//!
//! Content taller than one page is split across as many pages as needed at
//! the same scale, never shrunk and never clipped.

use crate::error::RenderError;
use crate::layout_config::{DocumentPlan, PagePlacement};
use crate::pipeline::ExportConfig;

/// Build the page plan for a `width` × `height` px raster.
pub fn paginate(
    width: u32,
    height: u32,
    config: &ExportConfig,
) -> Result<DocumentPlan, RenderError> {
    config.validate()?;
    if width == 0 || height == 0 {
        return Err(RenderError::EmptySurface { width, height });
    }

    let usable_w = config.usable_width_mm();
    let usable_h = config.usable_height_mm();
    let px_per_mm = width as f32 / usable_w;
    let rows_per_page = ((usable_h * px_per_mm).floor() as u32).max(1);
    let page_count = height.div_ceil(rows_per_page);

    log::debug!(
        "paginating {width}x{height} px at {px_per_mm:.3} px/mm: \
         {rows_per_page} rows per page, {page_count} page(s)"
    );

    let pages = (0..page_count)
        .map(|k| {
            let top = k * rows_per_page;
            let rows = rows_per_page.min(height - top);
            PagePlacement {
                page_index: k as usize,
                source_top_px: top,
                source_height_px: rows,
                x_mm: config.margin_mm,
                y_mm: config.margin_mm,
                width_mm: usable_w,
                height_mm: rows as f32 / px_per_mm,
            }
        })
        .collect();

    Ok(DocumentPlan {
        title: config.title.clone(),
        page_width_mm: config.page_width_mm,
        page_height_mm: config.page_height_mm,
        margin_mm: config.margin_mm,
        source_width_px: width,
        source_height_px: height,
        pages,
    })
}
