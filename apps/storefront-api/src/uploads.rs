//! # Image Uploads
//!
//! Stores uploaded images on disk and hands back the relative path that is
//! saved on the record.
//!
//! ```text
//! <static_dir>/images/<entity>/<key>/<uuid>.<ext>
//!               │        │       │
//!               │        │       └── sku code or category id
//!               │        └────────── "sku" | "category"
//!               └─────────────────── served under /static/images/...
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// One file part of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ImageStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `file` under `images/<entity>/<key>/` and returns its path
    /// relative to the static root.
    pub async fn save(&self, entity: &str, key: &str, file: &UploadedFile) -> Result<String, ApiError> {
        if file.bytes.is_empty() {
            return Err(ApiError::BadRequest(format!("{} is empty", file.field)));
        }
        let extension = image_extension(file.file_name.as_deref())
            .ok_or_else(|| ApiError::BadRequest(format!("{} must be one of {}", file.field, ALLOWED_EXTENSIONS.join(", "))))?;
        let key = safe_segment(key)
            .ok_or_else(|| ApiError::BadRequest(format!("cannot store uploads under '{key}'")))?;

        let relative = format!("images/{entity}/{key}/{}.{extension}", Uuid::new_v4());
        let target = self.root.join(&relative);
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&target, &file.bytes).await?;

        debug!(path = %relative, bytes = file.bytes.len(), "Stored upload");
        Ok(relative)
    }
}

/// Lower-cased extension when it is an accepted image type.
fn image_extension(file_name: Option<&str>) -> Option<String> {
    let extension = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// A path segment with no separators or dot-only names.
fn safe_segment(key: &str) -> Option<&str> {
    let ok = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    ok.then_some(key)
}
