//! Error types for the CV builder and its export pipeline.

use std::io;
use thiserror::Error;

use crate::document::ExperienceId;

/// Conditions reported by an export request.
///
/// Everything except [`ExportError::Failed`] means the export never started.
#[derive(Error, Debug)]
pub enum ExportError {
    /// No preview surface is attached, so there is nothing to capture.
    #[error("No renderable surface is available for export")]
    SurfaceUnavailable,

    /// Another export is still in flight.
    #[error("An export is already in progress")]
    InProgress,

    /// Rasterisation, pagination or serialisation failed. Details are logged.
    #[error("Export failed")]
    Failed,
}

/// Internal failures inside the rasterise → paginate → serialise chain.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The flexbox layout engine rejected the surface tree.
    #[error("Layout error: {0}")]
    Layout(String),

    /// Image decoding or encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// PDF serialisation failed.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The surface rasterised to zero pixels in one dimension.
    #[error("Surface rasterised to an empty image ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },

    /// A blocking worker task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),

    /// The export configuration cannot produce a page.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Profile image rejections.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The file exceeds the upload limit; nothing was read or decoded.
    #[error("Image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// The bytes are not a PNG or JPEG image.
    #[error("Unsupported image format")]
    UnsupportedFormat,

    /// A `src` string is not a base64 data URI.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// I/O error when reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Text-assistant preconditions.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssistError {
    /// Required inputs for the generator are empty.
    #[error("Incomplete information: {} required", missing.join(", "))]
    IncompleteInformation { missing: Vec<&'static str> },

    /// The work-experience entry does not exist.
    #[error("No work experience with id {0}")]
    UnknownExperience(ExperienceId),
}

/// Loading a document from serialised content.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate work experience id {0}")]
    DuplicateExperienceId(ExperienceId),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = UploadError::TooLarge {
            size: 6_000_000,
            limit: 5_242_880,
        };
        assert_eq!(
            err.to_string(),
            "Image is 6000000 bytes, the limit is 5242880 bytes"
        );

        let err = AssistError::IncompleteInformation {
            missing: vec!["full name", "position"],
        };
        assert_eq!(
            err.to_string(),
            "Incomplete information: full name, position required"
        );
    }

    #[test]
    fn export_failure_is_generic() {
        assert_eq!(ExportError::Failed.to_string(), "Export failed");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: UploadError = io_err.into();
        assert!(matches!(err, UploadError::Io(_)));
    }
}
