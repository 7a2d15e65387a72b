use anyhow::Result;

use crate::models::{NewPhoto, Photo, PhotoId, StoredPhoto};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_TITLE_CHARS: usize = 255;
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("photo {0} not found")]
    NotFound(PhotoId),

    #[error("unsupported file type {0:?}; expected JPEG, PNG or GIF")]
    UnsupportedMime(String),

    #[error("upload is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("upload is empty")]
    Empty,

    #[error("upload is not a readable image: {0}")]
    InvalidImage(String),
}

/// Where originals come from and edited exports go. Edits are always
/// uploaded as new photos; nothing is overwritten in place.
pub trait PhotoStore {
    fn fetch(&self, id: PhotoId) -> Result<StoredPhoto>;
    fn upload(&self, photo: NewPhoto) -> Result<Photo>;
    fn delete(&self, id: PhotoId) -> Result<bool>;
    fn list(&self) -> Result<Vec<Photo>>;
    fn rename(&self, id: PhotoId, title: &str) -> Result<bool>;
}

/// Normalize `image/jpg` to `image/jpeg` and reject anything else the
/// upload form would not accept.
pub fn validate_mime(mime: &str) -> Result<&'static str, CatalogError> {
    let lower = mime.trim().to_ascii_lowercase();
    let lower = if lower == "image/jpg" { "image/jpeg".to_string() } else { lower };
    ACCEPTED_MIME_TYPES
        .iter()
        .find(|m| **m == lower)
        .copied()
        .ok_or_else(|| CatalogError::UnsupportedMime(mime.to_string()))
}

pub fn validate_size(size: usize) -> Result<(), CatalogError> {
    if size == 0 {
        return Err(CatalogError::Empty);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(CatalogError::TooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Truncate on a character boundary.
pub fn clamp_title(title: &str) -> String {
    title.trim().chars().take(MAX_TITLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types() {
        for (input, expected) in [
            ("image/jpeg", Some("image/jpeg")),
            ("image/jpg", Some("image/jpeg")),
            ("IMAGE/PNG", Some("image/png")),
            ("image/gif", Some("image/gif")),
            ("image/webp", None),
            ("text/plain", None),
        ] {
            assert_eq!(validate_mime(input).ok(), expected, "{input}");
        }
    }

    #[test]
    fn size_limits() {
        assert!(matches!(validate_size(0), Err(CatalogError::Empty)));
        assert!(validate_size(MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            validate_size(MAX_UPLOAD_BYTES + 1),
            Err(CatalogError::TooLarge { .. })
        ));
    }

    #[test]
    fn titles_truncate_by_chars() {
        let long = "ż".repeat(300);
        let clamped = clamp_title(&long);
        assert_eq!(clamped.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(clamp_title("  beach  "), "beach");
    }
}
