//! MIME detection for uploaded images.
//!
//! Detection is by extension; the allow-list doubles as the upload type
//! policy, so anything outside this table is rejected before the pipeline.

use std::path::Path;

/// MIME type for a supported raster-image filename, `None` otherwise.
pub fn image_mime_type(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png"          => Some("image/png"),
        "gif"          => Some("image/gif"),
        "bmp"          => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "webp"         => Some("image/webp"),
        _              => None,
    }
}
