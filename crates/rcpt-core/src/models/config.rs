//! Configuration structures for extraction and the surrounding pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fields::currency::default_currency_map;
use crate::fields::dates::MONTH_ABBREVIATIONS;
use crate::fields::numbers::DecimalConvention;

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Main configuration for rcpt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Field vocabularies the registry is compiled from.
    pub extraction: ExtractionConfig,

    /// Output settings.
    pub output: OutputConfig,

    /// OCR settings (used only with the `ocr` feature).
    pub ocr: OcrConfig,
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

/// Vocabularies for every field kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub amount: AmountConfig,
    pub date: DateConfig,
    pub shop: ShopConfig,
    pub items: ItemsConfig,
    pub tax: TaxConfig,
    pub invoice: InvoiceConfig,
    pub payment: PaymentConfig,
}

/// Amount keywords, currency tokens and number separators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountConfig {
    /// Labels that precede the amount ("total", "grand total", ...).
    pub keywords: Vec<String>,

    /// Currency token -> canonical code. Codes are tokens for themselves.
    pub currencies: BTreeMap<String, String>,

    /// Which character is the decimal point. Applies to every numeric
    /// literal the registry parses.
    pub decimal_convention: DecimalConvention,

    /// Digit-group separators; must not contain the decimal separator.
    pub thousand_separators: Vec<char>,
}

impl Default for AmountConfig {
    fn default() -> Self {
        let decimal_convention = DecimalConvention::Point;
        Self {
            keywords: strings(&[
                "total",
                "amount",
                "grand total",
                "balance",
                "net amount",
                "subtotal",
                "final amount",
                "payment due",
                "amt due",
                "total payable",
                "current due",
                "outstanding balance",
                "sum",
                "including Tax",
                "TOTAL",
            ]),
            currencies: default_currency_map(),
            thousand_separators: decimal_convention.default_thousands(),
            decimal_convention,
        }
    }
}

/// Date separators and month names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Characters separating numeric day, month and year.
    pub separators: Vec<char>,

    /// Month name prefixes for "15 Mar 2024" style dates.
    pub month_names: Vec<String>,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            separators: vec!['-', '/', '.'],
            month_names: strings(&MONTH_ABBREVIATIONS),
        }
    }
}

/// Business suffixes that end a shop name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub suffixes: Vec<String>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            suffixes: strings(&[
                "PETROLEUM",
                "GAS",
                "STORE",
                "SUPPLY",
                "SHOP",
                "MART",
                "FUEL",
                "SUPERMARKET",
                "DEALER",
                "TRADERS",
                "SERVICE",
                "CENTER",
                "OUTLET",
                "WHOLESALE",
                "DISTRIBUTORS",
                "AGENCY",
            ]),
        }
    }
}

/// Units of measure for line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemsConfig {
    pub units: Vec<String>,

    /// Collect every line item instead of only the first.
    pub multiple_items: bool,
}

impl Default for ItemsConfig {
    fn default() -> Self {
        Self {
            units: strings(&[
                "LTR", "L", "LITERS", "ML", "KG", "KGS", "G", "GRAMS", "MG", "TON", "PCS",
            ]),
            multiple_items: false,
        }
    }
}

/// Tax identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxConfig {
    pub identifiers: Vec<String>,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            identifiers: strings(&["GST", "VAT", "SVC CHG", "SERVICE CHARGE", "TAX", "SALES TAX"]),
        }
    }
}

/// Invoice number prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceConfig {
    pub prefixes: Vec<String>,

    /// Minimum length of the number token.
    pub min_length: usize,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            prefixes: strings(&[
                "Invoice",
                "Bill",
                "Receipt",
                "Order",
                "Credit Note",
                "Debit Note",
                "Reference",
                "Tax Invoice",
                "Bill No",
            ]),
            min_length: 3,
        }
    }
}

/// Payment lead phrases and method names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Phrases introducing the method ("Payment", "Paid By").
    pub lead_phrases: Vec<String>,

    pub methods: Vec<String>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            lead_phrases: strings(&["Payment", "Paid By"]),
            methods: strings(&[
                "Credit Card",
                "Debit Card",
                "Cash",
                "Cheque",
                "Online Transfer",
                "UPI",
                "Netbanking",
                "PayPal",
            ]),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output.
    pub pretty: bool,

    /// Include per-field failures next to the fields.
    pub include_failures: bool,

    /// Add a normalized ISO date to text output.
    pub normalize_dates: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            include_failures: false,
            normalize_dates: true,
        }
    }
}

/// OCR model settings for image input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` markers emitted for unknown glyphs.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}
