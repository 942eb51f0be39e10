//! Rasterisation – the capability that turns a captured [`Surface`] into
//! pixels, and the default headless implementation built on the surface
//! layout and the software [`Canvas`].

use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;

use image::{imageops, ImageFormat, RgbaImage};

use crate::canvas::{Canvas, OutlineFlattener};
use crate::error::RenderError;
use crate::fonts::FontManager;
use crate::layout::{layout_surface, BoxContent, PositionedBox, TextBlock};
use crate::preview::Surface;
use crate::template::Color;
use crate::upload::decode_data_uri;

/// A rasterised surface.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: RgbaImage,
    /// Supersampling factor the surface was drawn at.
    pub scale: f32,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage, scale: f32) -> Self {
        Self { pixels, scale }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Copy of rows `top..top + rows`, full width.
    pub fn rows(&self, top: u32, rows: u32) -> RgbaImage {
        imageops::crop_imm(&self.pixels, 0, top, self.pixels.width(), rows).to_image()
    }

    /// PNG-encode a row band.
    pub fn rows_png(&self, top: u32, rows: u32) -> Result<Vec<u8>, RenderError> {
        let mut buf = Vec::new();
        self.rows(top, rows)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }
}

/// Anything that can capture a surface as pixels.
///
/// The returned future must own everything it needs: the pipeline awaits it
/// while the session keeps accepting edits.
pub trait Rasterizer: Send + Sync + 'static {
    fn rasterize(
        &self,
        surface: Surface,
        scale: f32,
    ) -> impl Future<Output = Result<RasterImage, RenderError>> + Send;
}

/// Default rasteriser: flexbox layout + software painting, run on the
/// blocking thread pool.
#[derive(Clone, Default)]
pub struct LayoutRasterizer {
    fonts: Arc<FontManager>,
}

impl LayoutRasterizer {
    pub fn new(fonts: Arc<FontManager>) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontManager {
        &self.fonts
    }
}

impl Rasterizer for LayoutRasterizer {
    fn rasterize(
        &self,
        surface: Surface,
        scale: f32,
    ) -> impl Future<Output = Result<RasterImage, RenderError>> + Send {
        let fonts = Arc::clone(&self.fonts);
        async move {
            tokio::task::spawn_blocking(move || paint_surface(&surface, scale, &fonts))
                .await
                .map_err(|e| RenderError::Task(e.to_string()))?
        }
    }
}

/// Lay out and paint `surface` at `scale` device pixels per CSS pixel.
pub fn paint_surface(
    surface: &Surface,
    scale: f32,
    fonts: &FontManager,
) -> Result<RasterImage, RenderError> {
    let layout = layout_surface(surface, fonts)?;
    let width = (layout.width * scale).ceil() as u32;
    let height = (layout.height * scale).ceil() as u32;
    if width == 0 || height == 0 {
        return Err(RenderError::EmptySurface { width, height });
    }
    log::debug!(
        "rasterising {}x{} surface at {scale}x -> {width}x{height} px",
        layout.width,
        layout.height
    );

    let mut painter = Painter {
        canvas: Canvas::new(width, height),
        scale,
        fonts,
    };
    painter.paint_box(&layout.root);
    Ok(RasterImage::new(painter.canvas.into_image(), scale))
}

struct Painter<'a> {
    canvas: Canvas,
    scale: f32,
    fonts: &'a FontManager,
}

impl Painter<'_> {
    fn paint_box(&mut self, b: &PositionedBox) {
        let s = self.scale;
        let (x, y, w, h) = (b.x * s, b.y * s, b.width * s, b.height * s);

        if let Some(bg) = b.background {
            self.canvas.fill_rect(x, y, w, h, bg);
        }
        if let Some(border) = b.border {
            self.canvas.stroke_rect(x, y, w, h, border.width * s, border.color);
        }

        match &b.content {
            BoxContent::None => {}
            BoxContent::Text(text) => self.paint_text(b, text),
            BoxContent::Image { src, round } => self.paint_image(src, x, y, w, h, *round),
            BoxContent::AvatarPlaceholder { color } => {
                let r = w.min(h) / 2.0;
                let (cx, cy) = (x + w / 2.0, y + h / 2.0);
                self.canvas.fill_circle(cx, cy, r, color.with_alpha(color.a * 0.5));
                // head and shoulders
                self.canvas.fill_circle(cx, cy - r * 0.2, r * 0.3, *color);
                self.canvas
                    .fill_rect(cx - r * 0.45, cy + r * 0.2, r * 0.9, r * 0.35, *color);
            }
        }

        for child in &b.children {
            self.paint_box(child);
        }
    }

    fn paint_image(&mut self, src: &str, x: f32, y: f32, w: f32, h: f32, round: bool) {
        let decoded = decode_data_uri(src)
            .map_err(|e| e.to_string())
            .and_then(|bytes| image::load_from_memory(&bytes).map_err(|e| e.to_string()));
        let img = match decoded {
            Ok(img) => img,
            Err(e) => {
                log::warn!("Skipping image: {e}");
                return;
            }
        };
        let (tw, th) = (w.round().max(1.0) as u32, h.round().max(1.0) as u32);
        let scaled = imageops::resize(&img.to_rgba8(), tw, th, imageops::FilterType::Triangle);
        self.canvas
            .draw_image(&scaled, x.round() as i64, y.round() as i64, round);
    }

    fn paint_text(&mut self, b: &PositionedBox, text: &TextBlock) {
        let s = self.scale;
        let fonts = self.fonts;
        let size = text.font_size * s;
        let data = fonts.get(text.key);
        let ascender = fonts.ascender_px(text.font_size, text.key) * s;
        let face = data.face();

        for (i, line) in text.lines.iter().enumerate() {
            if line.text.is_empty() {
                continue;
            }
            let left = (b.x + line.x_offset) * s;
            let line_top = (b.y + i as f32 * text.line_height) * s;
            // Centre the em box inside the line box.
            let leading = (text.line_height * s - size) / 2.0;
            let baseline = line_top + leading.max(0.0) + ascender;

            match &face {
                Some(face) => {
                    let scale = size / data.units_per_em;
                    let mut flattener = OutlineFlattener::new(left, baseline, scale);
                    let mut pen = left;
                    for ch in line.text.chars() {
                        let Some(gid) = face.glyph_index(ch) else {
                            pen += size * 0.5;
                            continue;
                        };
                        flattener.set_origin(pen);
                        face.outline_glyph(gid, &mut flattener);
                        pen += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
                    }
                    self.canvas.fill_path(&flattener.edges, text.color);
                }
                None => self.paint_greeked(&line.text, left, baseline, text, size),
            }
        }
    }

    /// Without a real face, draw each word as a bar of its measured width
    /// spanning the x-height.
    fn paint_greeked(&mut self, line: &str, left: f32, baseline: f32, text: &TextBlock, size: f32) {
        let space = self.fonts.text_width(" ", size, text.key);
        let bar = Color {
            a: text.color.a * 0.7,
            ..text.color
        };
        let x_height = size * 0.5;
        let mut pen = left;
        for word in line.split(' ') {
            let w = self.fonts.text_width(word, size, text.key);
            self.canvas
                .fill_rect(pen, baseline - x_height, w, x_height, bar);
            pen += w + space;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::project;
    use crate::samples;
    use crate::template::TemplateChoice;

    fn surface(template: TemplateChoice) -> Surface {
        Surface {
            tree: project(&samples::jane_doe(), template),
            width_px: 400.0,
        }
    }

    #[test]
    fn raster_dimensions_follow_scale() {
        let fonts = FontManager::default();
        let one = paint_surface(&surface(TemplateChoice::Modern), 1.0, &fonts).unwrap();
        let two = paint_surface(&surface(TemplateChoice::Modern), 2.0, &fonts).unwrap();
        assert_eq!(one.width(), 400);
        assert_eq!(two.width(), 800);
        assert!(two.height().abs_diff(one.height() * 2) <= 2);
    }

    #[test]
    fn theme_background_is_painted_not_forced_white() {
        let fonts = FontManager::default();
        let raster = paint_surface(&surface(TemplateChoice::Creative), 1.0, &fonts).unwrap();
        // Top-left corner is the creative page tint, not pure white.
        let px = raster.pixels().get_pixel(0, 0).0;
        assert_eq!(px[3], 255);
        assert_ne!(&px[..3], &[255, 255, 255]);
    }

    #[test]
    fn greeked_text_leaves_ink() {
        let fonts = FontManager::default();
        let raster = paint_surface(&surface(TemplateChoice::Classic), 1.0, &fonts).unwrap();
        let dark = raster
            .pixels()
            .pixels()
            .filter(|p| p.0[0] < 128 && p.0[3] == 255)
            .count();
        assert!(dark > 100, "expected text ink, found {dark} dark pixels");
    }

    #[test]
    fn row_band_png_is_valid() {
        let fonts = FontManager::default();
        let raster = paint_surface(&surface(TemplateChoice::Modern), 1.0, &fonts).unwrap();
        let png = raster.rows_png(10, 20).unwrap();
        let back = image::load_from_memory(&png).unwrap();
        assert_eq!((back.width(), back.height()), (raster.width(), 20));
    }

    #[tokio::test]
    async fn layout_rasterizer_runs_off_thread() {
        let rasterizer = LayoutRasterizer::default();
        let raster = rasterizer
            .rasterize(surface(TemplateChoice::Modern), 2.0)
            .await
            .unwrap();
        assert_eq!(raster.width(), 800);
        assert!((raster.scale - 2.0).abs() < f32::EPSILON);
    }
}
