use serde::{Deserialize, Serialize};

pub type PhotoId = i64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub title: String,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub content_hash: String,
    /// Photo this one was exported from, when saved by the editor.
    pub derived_from: Option<PhotoId>,
    pub created_at: String,
}

/// Photo record together with its encoded bytes.
#[derive(Clone, Debug)]
pub struct StoredPhoto {
    pub photo: Photo,
    pub bytes: Vec<u8>,
}

/// Upload request. Without a title the filename is used.
#[derive(Clone, Debug, Default)]
pub struct NewPhoto {
    pub title: Option<String>,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub derived_from: Option<PhotoId>,
}

impl NewPhoto {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn derived_from(mut self, id: PhotoId) -> Self {
        self.derived_from = Some(id);
        self
    }
}
