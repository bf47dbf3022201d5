//! Text sources feeding the extraction engine.
//!
//! The engine only ever sees a string. Where it comes from (a text file,
//! stdin, an OCR pass over an image) is the business of a [`TextSource`].

mod plain;

#[cfg(feature = "ocr")]
mod ocr;

pub use plain::PlainTextSource;

#[cfg(feature = "ocr")]
pub use ocr::OcrTextSource;

use std::path::Path;

use crate::error::SourceError;

/// Result type for text source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Trait for anything that turns an input file into OCR-style text.
pub trait TextSource {
    /// Whether this source can read the given path.
    fn supports(&self, path: &Path) -> bool;

    /// Read the text of the given path.
    fn read_text(&self, path: &Path) -> Result<String>;
}

/// Lower-cased extension of a path, or an empty string.
pub(crate) fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
