//! Turns statement files into candidate transactions.
mod image;
mod tabular;

pub use self::image::parse_image;
pub use self::tabular::parse_csv;

use crate::error::ImportError;
use std::path::Path;

/// The kind of statement file, decided by its extension.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FileKind {
    Csv,
    Image,
}

impl FileKind {
    /// Picks the parser for `path` from its (case-insensitive) extension.
    ///
    /// # Errors
    /// - `ImportError::UnsupportedFile` for anything other than `.csv`, `.png`, `.jpg`, `.jpeg`.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(FileKind::Csv),
            "png" | "jpg" | "jpeg" => Ok(FileKind::Image),
            _ => Err(ImportError::UnsupportedFile(format!(".{ext}"))),
        }
    }
}
