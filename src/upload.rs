//! Profile image upload – size bound, format sniffing, and data-URI
//! encoding/decoding.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::ImageFormat;

use crate::error::UploadError;

/// Largest accepted upload (5 MiB).
pub const MAX_PROFILE_IMAGE_BYTES: u64 = 5_242_880;

fn check_size(size: u64) -> Result<(), UploadError> {
    if size > MAX_PROFILE_IMAGE_BYTES {
        log::warn!("rejecting {size}-byte profile image");
        return Err(UploadError::TooLarge {
            size,
            limit: MAX_PROFILE_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// MIME type of a PNG or JPEG payload.
fn sniff_mime(bytes: &[u8]) -> Result<&'static str, UploadError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok("image/png"),
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        _ => Err(UploadError::UnsupportedFormat),
    }
}

/// Encode raw image bytes as a `data:` URI.
pub fn encode_profile_image(bytes: &[u8]) -> Result<String, UploadError> {
    check_size(bytes.len() as u64)?;
    let mime = sniff_mime(bytes)?;
    Ok(format!("data:{mime};base64,{}", BASE64_STD.encode(bytes)))
}

/// Read an image file and encode it as a `data:` URI.
///
/// The size is checked from file metadata before anything is read.
pub async fn read_profile_image(path: impl AsRef<Path>) -> Result<String, UploadError> {
    let path = path.as_ref();
    let meta = tokio::fs::metadata(path).await?;
    check_size(meta.len())?;
    let bytes = tokio::fs::read(path).await?;
    let uri = encode_profile_image(&bytes)?;
    log::info!("accepted profile image {} ({} bytes)", path.display(), bytes.len());
    Ok(uri)
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>, UploadError> {
    let Some(rest) = src.strip_prefix("data:") else {
        let preview: String = src.chars().take(40).collect();
        return Err(UploadError::InvalidDataUri(format!(
            "expected a base64 data URI, got {preview:?}"
        )));
    };
    let (header, data) = rest.split_once(',').ok_or_else(|| {
        UploadError::InvalidDataUri("missing `,` between header and data".to_string())
    })?;
    if !header.contains(";base64") {
        return Err(UploadError::InvalidDataUri(
            "only base64-encoded data URIs are supported".to_string(),
        ));
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| UploadError::InvalidDataUri(format!("base64 decode error: {e}")))
}
