//! Font metrics for preview layout and glyph access for rasterisation.
//!
//! With no face loaded every measurement falls back to a Helvetica-like
//! heuristic, which keeps layout deterministic without shipping font files.
//! Loading a TTF/OTF face switches measurement to real glyph advances and
//! lets the rasteriser draw real outlines.

use std::collections::HashMap;

/// Font variant selector.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub const REGULAR: FontKey = FontKey {
        bold: false,
        italic: false,
    };
    pub const BOLD: FontKey = FontKey {
        bold: true,
        italic: false,
    };
}

/// A loaded face with the vertical metrics layout needs.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

impl FontData {
    fn synthetic() -> Self {
        Self {
            bytes: Vec::new(),
            units_per_em: 1000.0,
            ascender: 750.0,
            descender: -250.0,
        }
    }

    pub fn has_outlines(&self) -> bool {
        !self.bytes.is_empty()
    }

    /// Parse the face for glyph lookups. `None` for synthetic metrics.
    pub fn face(&self) -> Option<ttf_parser::Face<'_>> {
        if self.bytes.is_empty() {
            return None;
        }
        ttf_parser::Face::parse(&self.bytes, 0).ok()
    }
}

pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    fallback: FontData,
}

impl Default for FontManager {
    fn default() -> Self {
        Self {
            fonts: HashMap::new(),
            fallback: FontData::synthetic(),
        }
    }
}

impl FontManager {
    /// Register a TTF/OTF face for `key`. The first face loaded also becomes
    /// the fallback for variants that have no face of their own.
    pub fn load_font(&mut self, key: FontKey, bytes: Vec<u8>) -> Result<(), String> {
        let face =
            ttf_parser::Face::parse(&bytes, 0).map_err(|e| format!("Failed to parse font: {e}"))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            bytes,
        };

        if self.fonts.is_empty() {
            self.fallback = data.clone();
        }
        log::info!("loaded font face {key:?}");
        self.fonts.insert(key, data);
        Ok(())
    }

    pub fn get(&self, key: FontKey) -> &FontData {
        self.fonts.get(&key).unwrap_or(&self.fallback)
    }

    pub fn has_real_fonts(&self) -> bool {
        self.fallback.has_outlines()
    }

    /// Width of `text` at `font_size` px.
    pub fn text_width(&self, text: &str, font_size: f32, key: FontKey) -> f32 {
        let data = self.get(key);
        let Some(face) = data.face() else {
            // Average glyph ≈ 0.5 em for proportional sans; bold ≈ 10 % wider.
            let avg = if key.bold { 0.55 } else { 0.5 };
            return text.chars().count() as f32 * font_size * avg;
        };

        let scale = font_size / data.units_per_em;
        text.chars()
            .map(|ch| match face.glyph_index(ch) {
                Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                None => font_size * 0.5,
            })
            .sum()
    }

    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    pub fn ascender_px(&self, font_size: f32, key: FontKey) -> f32 {
        let data = self.get(key);
        data.ascender * font_size / data.units_per_em
    }
}

/// Greedy word wrap to `max_width` px. Existing newlines start new lines;
/// a single word wider than the line is kept whole.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    key: FontKey,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if fonts.text_width(&candidate, font_size, key) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_text_width() {
        let mgr = FontManager::default();
        let w = mgr.text_width("Hello", 16.0, FontKey::REGULAR);
        // 5 chars × 16 × 0.5 = 40
        assert!((w - 40.0).abs() < 0.1);
        assert!(mgr.text_width("Hello", 16.0, FontKey::BOLD) > w);
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_text("Hello world foo bar", 16.0, FontKey::REGULAR, 60.0, &mgr);
        assert!(lines.len() >= 2, "Expected wrapping, got {:?}", lines);
        assert_eq!(lines.join(" "), "Hello world foo bar");
    }

    #[test]
    fn wrap_keeps_explicit_newlines() {
        let mgr = FontManager::default();
        let lines = wrap_text("one\n\ntwo", 10.0, FontKey::REGULAR, 500.0, &mgr);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn rejects_garbage_font_bytes() {
        let mut mgr = FontManager::default();
        assert!(mgr.load_font(FontKey::REGULAR, vec![0, 1, 2, 3]).is_err());
        assert!(!mgr.has_real_fonts());
    }
}
