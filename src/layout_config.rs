//! Export plan – the frozen description of which raster rows land where on
//! which page. Produced by pagination, consumed by the PDF renderer.

use serde::{Deserialize, Serialize};

/// A complete export layout ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPlan {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "DocumentPlan::default_title")]
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    /// Dimensions of the source raster in device pixels.
    pub source_width_px: u32,
    pub source_height_px: u32,
    /// Ordered pages, one raster slice each.
    pub pages: Vec<PagePlacement>,
}

/// One page: a horizontal band of the source raster and where it goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePlacement {
    pub page_index: usize,
    /// First source row of the band.
    pub source_top_px: u32,
    /// Number of source rows in the band.
    pub source_height_px: u32,
    /// Placement of the band's top-left corner, from the page's top-left.
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PagePlacement {
    /// One past the last source row of the band.
    pub fn source_bottom_px(&self) -> u32 {
        self.source_top_px + self.source_height_px
    }
}

impl DocumentPlan {
    fn default_title() -> String {
        "Curriculum Vitae".to_string()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
