//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod fields;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use rcpt_core::models::config::RcptConfig;
use rcpt_core::{PlainTextSource, TextSource};

#[cfg(feature = "ocr")]
use rcpt_core::OcrTextSource;
#[cfg(feature = "ocr")]
use rcpt_core::models::config::OcrConfig;

/// Per-user configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rcpt")
        .join("config.json")
}

/// Configuration file in effect: `--config` if given, else the per-user file.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// Load `--config`, falling back to the per-user file, then to defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    let path = config_file(config_path);

    if config_path.is_some() || path.exists() {
        debug!("Loading configuration from {}", path.display());
        RcptConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))
    } else {
        Ok(RcptConfig::default())
    }
}

/// Reads receipt text from files, stdin, and (with the `ocr` feature) images.
pub struct InputReader {
    plain: PlainTextSource,
    #[cfg(feature = "ocr")]
    ocr: std::cell::OnceCell<OcrTextSource>,
    #[cfg(feature = "ocr")]
    ocr_config: OcrConfig,
}

impl InputReader {
    pub fn new(config: &RcptConfig) -> Self {
        #[cfg(not(feature = "ocr"))]
        let _ = config;

        Self {
            plain: PlainTextSource::new(),
            #[cfg(feature = "ocr")]
            ocr: std::cell::OnceCell::new(),
            #[cfg(feature = "ocr")]
            ocr_config: config.ocr.clone(),
        }
    }

    /// Whether `path` has an extension some source can read.
    pub fn supports(&self, path: &Path) -> bool {
        self.plain.supports(path) || (cfg!(feature = "ocr") && is_image(path))
    }

    /// Read the text of `input`; `-` means stdin.
    pub fn read(&self, input: &str) -> anyhow::Result<String> {
        if input == "-" {
            return Ok(self.plain.read_from(std::io::stdin().lock())?);
        }

        let path = Path::new(input);
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
        self.read_path(path)
    }

    pub fn read_path(&self, path: &Path) -> anyhow::Result<String> {
        if self.plain.supports(path) {
            return Ok(self.plain.read_text(path)?);
        }

        #[cfg(feature = "ocr")]
        if is_image(path) {
            return Ok(self.ocr()?.read_text(path)?);
        }

        #[cfg(not(feature = "ocr"))]
        if is_image(path) {
            anyhow::bail!(
                "{} is an image; rebuild with the `ocr` feature to read images",
                path.display()
            );
        }
        anyhow::bail!("Unsupported file format: {}", path.display())
    }

    #[cfg(feature = "ocr")]
    fn ocr(&self) -> anyhow::Result<&OcrTextSource> {
        if self.ocr.get().is_none() {
            let source = OcrTextSource::new(self.ocr_config.clone())?;
            let _ = self.ocr.set(source);
        }
        self.ocr
            .get()
            .ok_or_else(|| anyhow::anyhow!("OCR engine unavailable"))
    }
}

fn is_image(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(
        ext.to_lowercase().as_str(),
        "png" | "jpg" | "jpeg" | "tiff" | "tif" | "bmp"
    )
}
