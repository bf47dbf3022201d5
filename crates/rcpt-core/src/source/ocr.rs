//! Image input through the `pure-onnx-ocr` engine.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::SourceError;
use crate::models::config::OcrConfig;

use super::{Result, TextSource, extension};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp"];

/// Row height (pixels) used to group recognized regions into lines.
const ROW_HEIGHT: f64 = 20.0;

/// OCR provider backed by `pure-onnx-ocr` (pure Rust, no external runtime).
///
/// Recognized regions are ordered top-to-bottom, left-to-right and joined
/// with newlines, so one receipt line becomes one text line.
pub struct OcrTextSource {
    engine: pure_onnx_ocr::engine::OcrEngine,
    config: OcrConfig,
}

impl OcrTextSource {
    /// Load the detection and recognition models named in `config`.
    pub fn new(config: OcrConfig) -> Result<Self> {
        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&config.model_path(&config.detection_model))
            .rec_model_path(&config.model_path(&config.recognition_model))
            .dictionary_path(&config.model_path(&config.dictionary))
            .build()
            .map_err(|e| SourceError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded OCR models from {}", config.model_dir.display());

        Ok(Self { engine, config })
    }

    /// Recognize the text of an image.
    pub fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        debug!("Running OCR on {}x{} image", width, height);

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| SourceError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut regions: Vec<(f64, f64, String)> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                (x, y, text)
            })
            .collect();

        regions.sort_by(|a, b| {
            let row_a = (a.1 / ROW_HEIGHT) as i64;
            let row_b = (b.1 / ROW_HEIGHT) as i64;
            row_a
                .cmp(&row_b)
                .then(a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        });

        let text = join_rows(&regions);

        info!(
            "OCR complete: {} regions in {}ms",
            regions.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

impl TextSource for OcrTextSource {
    fn supports(&self, path: &Path) -> bool {
        IMAGE_EXTENSIONS.contains(&extension(path).as_str())
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        if !self.supports(path) {
            return Err(SourceError::Unsupported(path.display().to_string()));
        }
        let image = image::open(path)
            .map_err(|e| SourceError::Unsupported(format!("{}: {}", path.display(), e)))?;
        self.recognize(&image)
    }
}

/// Smallest x and y of a region polygon.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| (x.min(c.x), y.min(c.y)))
}

/// Join sorted regions: same row with a space, new row with a newline.
fn join_rows(regions: &[(f64, f64, String)]) -> String {
    let mut text = String::new();
    let mut current_row = None;

    for (_, y, fragment) in regions {
        let row = (y / ROW_HEIGHT) as i64;
        match current_row {
            Some(r) if r == row => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        text.push_str(fragment.trim());
        current_row = Some(row);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_join_rows_groups_by_line() {
        let regions = vec![
            (10.0, 5.0, "ACME".to_string()),
            (80.0, 8.0, "MART".to_string()),
            (10.0, 45.0, "Total: $5.00".to_string()),
        ];
        assert_eq!(join_rows(&regions), "ACME MART\nTotal: $5.00");
    }
}
