//! Core library for receipt and invoice field extraction.
//!
//! This crate provides:
//! - A declarative registry of field rules (keywords, pattern, parser)
//! - An extraction engine that applies the registry to raw OCR text
//! - Currency resolution and locale-aware amount parsing
//! - Text sources feeding the engine (plain text, optional OCR)

pub mod error;
pub mod fields;
pub mod models;
pub mod source;

pub use error::{ConfigError, ExtractionError, RcptError, Result, SourceError};
pub use fields::{
    CurrencyCode, CurrencyTable, DecimalConvention, ExtractionEngine, FieldKind, FieldRegistry,
    FieldRule, ReceiptExtractor, RuleCompiler,
};
pub use models::config::{ExtractionConfig, RcptConfig};
pub use models::receipt::{ExtractionResult, FieldFailure, FieldValue, LineItem, Money};
pub use source::{PlainTextSource, TextSource};

#[cfg(feature = "ocr")]
pub use source::OcrTextSource;
