//! # cv-forge – guided CV builder with paginated PDF export
//!
//! A [`session::Session`] owns one CV and the controllers around it:
//!
//! 1. **Edit** – the content model and mutation API ([`document`])
//! 2. **Guide** – the five-step wizard with field gating ([`wizard`])
//! 3. **Style** – template choice and themes ([`template`])
//! 4. **Preview** – projection into a render tree ([`preview`]), laid out
//!    with Taffy ([`layout`])
//! 5. **Export** – rasterise ([`raster`]), slice into A4 pages
//!    ([`pagination`]) and emit PDF bytes via printpdf ([`render`]), behind
//!    a single-flight guard ([`pipeline`])

pub mod assist;
pub mod canvas;
pub mod document;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod layout_config;
pub mod pagination;
pub mod pipeline;
pub mod preview;
pub mod raster;
pub mod render;
pub mod samples;
pub mod session;
pub mod template;
pub mod upload;
pub mod wizard;

// Re-exports for convenience
pub use document::{CvContent, CvDocument, EditOutcome, ExperienceId};
pub use error::{ExportError, RenderError, UploadError};
pub use pipeline::{ExportConfig, ExportPipeline, ExportedFile};
pub use raster::{LayoutRasterizer, RasterImage, Rasterizer};
pub use session::{Session, SessionConfig};
pub use template::TemplateChoice;
