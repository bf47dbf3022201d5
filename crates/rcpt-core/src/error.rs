//! Error types for the rcpt-core library.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// Rule configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Text source error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while compiling the field registry.
///
/// These are startup failures: a registry that builds never raises them
/// again for any input text.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A vocabulary list the rule is built from is empty.
    #[error("{field}: empty {list} list")]
    EmptyList { field: String, list: &'static str },

    /// The generated pattern does not compile.
    #[error("{field}: invalid pattern: {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// The pattern and the parser disagree on capture groups.
    #[error("{field}: parser reads {expected} capture groups, pattern defines {actual}")]
    GroupMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Two rules share an output key.
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    /// Currency map target is not a three-letter upper-case code.
    #[error("invalid currency code {code:?} for token {token:?}")]
    InvalidCurrency { token: String, code: String },

    /// A separator is configured for both the decimal and thousand roles.
    #[error("separator {0:?} cannot be both decimal and thousand separator")]
    SeparatorConflict(char),
}

/// Per-field extraction failures.
///
/// The engine never propagates these: the field is dropped from the result
/// and the failure is kept as a diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The rule matched but the capture could not be converted.
    #[error("malformed {field} capture {value:?}: {reason}")]
    MalformedCapture {
        field: String,
        value: String,
        reason: String,
    },

    /// The rule matched but captured nothing usable.
    #[error("empty {field} capture")]
    EmptyCapture { field: String },

    /// The parser asked for a group the match did not produce.
    #[error("{field}: missing capture group {group}")]
    MissingGroup { field: String, group: usize },
}

impl ExtractionError {
    /// Name of the field the failure belongs to.
    pub fn field(&self) -> &str {
        match self {
            ExtractionError::MalformedCapture { field, .. }
            | ExtractionError::EmptyCapture { field }
            | ExtractionError::MissingGroup { field, .. } => field,
        }
    }
}

/// Errors from text sources feeding the engine.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The input kind is not handled by this source.
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// The input is not valid UTF-8 text.
    #[error("input is not valid UTF-8: {0}")]
    Encoding(String),

    /// Failed to load OCR models.
    #[error("failed to load OCR model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// I/O error while reading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
