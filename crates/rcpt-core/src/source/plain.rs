//! Plain UTF-8 text input.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::SourceError;

use super::{Result, TextSource, extension};

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "ocr", ""];

/// Reads text that has already been through OCR.
#[derive(Debug, Clone, Default)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn new() -> Self {
        Self
    }

    /// Read all of a reader (stdin, a pipe) as text.
    pub fn read_from<R: Read>(&self, mut reader: R) -> Result<String> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        decode(bytes)
    }
}

impl TextSource for PlainTextSource {
    fn supports(&self, path: &Path) -> bool {
        TEXT_EXTENSIONS.contains(&extension(path).as_str())
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        if !self.supports(path) {
            return Err(SourceError::Unsupported(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        decode(bytes)
    }
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| SourceError::Encoding(e.to_string()))
}
