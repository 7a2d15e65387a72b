#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("cannot export an empty {width}x{height} canvas")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("failed to encode {format}")]
    Encode {
        format: &'static str,
        #[source]
        err: image::ImageError,
    },

    #[error("unsupported export format {0:?}")]
    UnsupportedFormat(String),
}

/// Failures that reach the caller. Everything else (out-of-range knobs,
/// unknown layer ids, missing fonts or stickers) is recovered in place.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("failed to decode image")]
    Decode(#[source] anyhow::Error),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("photo store request failed")]
    Store(#[source] anyhow::Error),

    #[error("no image loaded")]
    NoImage,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
