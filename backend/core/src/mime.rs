//! MIME detection for menu images.
//!
//! Images reach the OCR stage either as browser screenshots or as photos
//! downloaded from a chat channel, so only image types matter here.

use std::path::Path;

/// Image extensions the OCR stage looks for, in lookup order.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp", "heic", "heif"];

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "webp"         => "image/webp",
        "gif"          => "image/gif",
        "heic"         => "image/heic",
        "heif"         => "image/heif",
        "json"         => "application/json",
        "md"           => "text/markdown",
        _              => "application/octet-stream",
    }
}

/// File extension to use when saving an image of the given MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" => Some("jpeg"),
        "image/png"  => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif"  => Some("gif"),
        "image/heic" => Some("heic"),
        "image/heif" => Some("heif"),
        _ => None,
    }
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}
