//! Software painter over an RGBA pixel buffer.
//!
//! The canvas starts fully transparent; every primitive composites
//! source-over, so whatever background the surface paints itself is what
//! ends up in the raster.

use image::{Rgba, RgbaImage};

use crate::template::Color;

/// Vertical sub-samples per pixel row for anti-aliased fills.
const SUBSAMPLES: usize = 4;

/// A straight edge of a polygon, in pixel space.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Composite `color` at `coverage` (0..=1) over pixel (x, y).
    fn blend(&mut self, x: u32, y: u32, color: Color, coverage: f32) {
        let alpha = (color.a * coverage).clamp(0.0, 1.0);
        if alpha <= 0.0 || x >= self.pixels.width() || y >= self.pixels.height() {
            return;
        }
        let dst = self.pixels.get_pixel(x, y).0;
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = alpha + dst_a * (1.0 - alpha);
        if out_a <= 0.0 {
            return;
        }
        let mix = |src: f32, d: u8| {
            let d = d as f32 / 255.0;
            let v = (src * alpha + d * dst_a * (1.0 - alpha)) / out_a;
            (v * 255.0).round().clamp(0.0, 255.0) as u8
        };
        self.pixels.put_pixel(
            x,
            y,
            Rgba([
                mix(color.r, dst[0]),
                mix(color.g, dst[1]),
                mix(color.b, dst[2]),
                (out_a * 255.0).round() as u8,
            ]),
        );
    }

    /// Fill an axis-aligned rectangle with fractional edge coverage.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        if w <= 0.0 || h <= 0.0 || color.is_transparent() {
            return;
        }
        let (x1, y1) = (x + w, y + h);
        let px0 = x.floor().max(0.0) as u32;
        let py0 = y.floor().max(0.0) as u32;
        let px1 = (x1.ceil().max(0.0) as u32).min(self.width());
        let py1 = (y1.ceil().max(0.0) as u32).min(self.height());
        for py in py0..py1 {
            let cy = (y1.min(py as f32 + 1.0) - y.max(py as f32)).max(0.0);
            for px in px0..px1 {
                let cx = (x1.min(px as f32 + 1.0) - x.max(px as f32)).max(0.0);
                self.blend(px, py, color, cx * cy);
            }
        }
    }

    /// Four-sided border drawn inside the rectangle.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: Color) {
        let t = width.min(w / 2.0).min(h / 2.0);
        self.fill_rect(x, y, w, t, color);
        self.fill_rect(x, y + h - t, w, t, color);
        self.fill_rect(x, y + t, t, h - 2.0 * t, color);
        self.fill_rect(x + w - t, y + t, t, h - 2.0 * t, color);
    }

    /// Anti-aliased disc.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, color: Color) {
        let edges = circle_edges(cx, cy, r, 48);
        self.fill_path(&edges, color);
    }

    /// Fill a closed polygon with the non-zero winding rule.
    pub fn fill_path(&mut self, edges: &[Edge], color: Color) {
        if edges.is_empty() || color.is_transparent() {
            return;
        }
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for e in edges {
            min_x = min_x.min(e.x0.min(e.x1));
            max_x = max_x.max(e.x0.max(e.x1));
            min_y = min_y.min(e.y0.min(e.y1));
            max_y = max_y.max(e.y0.max(e.y1));
        }
        let row0 = min_y.floor().max(0.0) as u32;
        let row1 = (max_y.ceil().max(0.0) as u32).min(self.height());
        let col0 = min_x.floor().max(0.0) as u32;
        let col1 = (max_x.ceil().max(0.0) as u32).min(self.width());
        if row0 >= row1 || col0 >= col1 {
            return;
        }

        let span = (col1 - col0) as usize;
        let mut coverage = vec![0.0f32; span];
        let mut crossings: Vec<(f32, i32)> = Vec::new();
        let weight = 1.0 / SUBSAMPLES as f32;

        for row in row0..row1 {
            coverage.iter_mut().for_each(|c| *c = 0.0);
            for sub in 0..SUBSAMPLES {
                let sy = row as f32 + (sub as f32 + 0.5) * weight;
                crossings.clear();
                for e in edges {
                    if e.y0 == e.y1 {
                        continue;
                    }
                    let (top, bottom, dir) = if e.y0 < e.y1 {
                        (e.y0, e.y1, 1)
                    } else {
                        (e.y1, e.y0, -1)
                    };
                    if sy < top || sy >= bottom {
                        continue;
                    }
                    let t = (sy - e.y0) / (e.y1 - e.y0);
                    crossings.push((e.x0 + t * (e.x1 - e.x0), dir));
                }
                crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut winding = 0;
                for pair in crossings.windows(2) {
                    winding += pair[0].1;
                    if winding == 0 {
                        continue;
                    }
                    let (xa, xb) = (pair[0].0.max(col0 as f32), pair[1].0.min(col1 as f32));
                    if xb <= xa {
                        continue;
                    }
                    let first = xa.floor() as u32;
                    let last = (xb.ceil() as u32).min(col1);
                    for px in first..last {
                        let overlap = xb.min(px as f32 + 1.0) - xa.max(px as f32);
                        if overlap > 0.0 {
                            coverage[(px - col0) as usize] += overlap * weight;
                        }
                    }
                }
            }
            for (i, c) in coverage.iter().enumerate() {
                if *c > 0.0 {
                    self.blend(col0 + i as u32, row, color, c.min(1.0));
                }
            }
        }
    }

    /// Composite `src` with its top-left corner at (x, y). With `round`,
    /// pixels outside the inscribed circle are dropped.
    pub fn draw_image(&mut self, src: &RgbaImage, x: i64, y: i64, round: bool) {
        let (w, h) = (src.width() as f32, src.height() as f32);
        let (cx, cy, r) = (w / 2.0, h / 2.0, w.min(h) / 2.0);
        for (sx, sy, px) in src.enumerate_pixels() {
            let (dx, dy) = (x + sx as i64, y + sy as i64);
            if dx < 0 || dy < 0 {
                continue;
            }
            let mask = if round {
                let d = ((sx as f32 + 0.5 - cx).powi(2) + (sy as f32 + 0.5 - cy).powi(2)).sqrt();
                (r - d + 0.5).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let [r8, g8, b8, a8] = px.0;
            let color = Color {
                r: r8 as f32 / 255.0,
                g: g8 as f32 / 255.0,
                b: b8 as f32 / 255.0,
                a: a8 as f32 / 255.0,
            };
            self.blend(dx as u32, dy as u32, color, mask);
        }
    }
}

fn circle_edges(cx: f32, cy: f32, r: f32, segments: usize) -> Vec<Edge> {
    let point = |i: usize| {
        let a = i as f32 / segments as f32 * std::f32::consts::TAU;
        (cx + r * a.cos(), cy + r * a.sin())
    };
    (0..segments)
        .map(|i| {
            let (x0, y0) = point(i);
            let (x1, y1) = point(i + 1);
            Edge { x0, y0, x1, y1 }
        })
        .collect()
}

/// Collects a glyph outline into flattened edges, mapping font units to
/// pixels: `px = origin_x + x·scale`, `py = baseline − y·scale`.
pub struct OutlineFlattener {
    pub edges: Vec<Edge>,
    origin_x: f32,
    baseline: f32,
    scale: f32,
    start: (f32, f32),
    last: (f32, f32),
}

impl OutlineFlattener {
    pub fn new(origin_x: f32, baseline: f32, scale: f32) -> Self {
        Self {
            edges: Vec::new(),
            origin_x,
            baseline,
            scale,
            start: (0.0, 0.0),
            last: (0.0, 0.0),
        }
    }

    /// Move the pen origin for the next glyph.
    pub fn set_origin(&mut self, origin_x: f32) {
        self.origin_x = origin_x;
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }

    fn push_line(&mut self, to: (f32, f32)) {
        let from = self.last;
        self.edges.push(Edge {
            x0: from.0,
            y0: from.1,
            x1: to.0,
            y1: to.1,
        });
        self.last = to;
    }
}

impl ttf_parser::OutlineBuilder for OutlineFlattener {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.start = p;
        self.last = p;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.push_line(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.last;
        let c = self.map(x1, y1);
        let p = self.map(x, y);
        const STEPS: usize = 8;
        for i in 1..=STEPS {
            let t = i as f32 / STEPS as f32;
            let u = 1.0 - t;
            self.push_line((
                u * u * p0.0 + 2.0 * u * t * c.0 + t * t * p.0,
                u * u * p0.1 + 2.0 * u * t * c.1 + t * t * p.1,
            ));
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.last;
        let c1 = self.map(x1, y1);
        let c2 = self.map(x2, y2);
        let p = self.map(x, y);
        const STEPS: usize = 12;
        for i in 1..=STEPS {
            let t = i as f32 / STEPS as f32;
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            self.push_line((
                a * p0.0 + b * c1.0 + c * c2.0 + d * p.0,
                a * p0.1 + b * c1.1 + c * c2.1 + d * p.1,
            ));
        }
    }

    fn close(&mut self) {
        let start = self.start;
        if self.last != start {
            self.push_line(start);
        }
    }
}
