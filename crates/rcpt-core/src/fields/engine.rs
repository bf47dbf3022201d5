//! Extraction engine: runs every registered rule over a text.

use std::path::Path;

use instant::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::ConfigError;
use crate::models::config::{ExtractionConfig, RcptConfig};
use crate::models::receipt::{ExtractionResult, FieldFailure};
use crate::source::TextSource;

use super::registry::FieldRegistry;

/// Trait for receipt field extractors.
pub trait ReceiptExtractor {
    /// Extract structured fields from raw OCR text.
    fn extract(&self, text: &str) -> ExtractionResult;
}

/// Applies a [`FieldRegistry`] to text.
///
/// The engine holds only the immutable registry, so one instance can be
/// shared across threads and called concurrently.
#[derive(Debug)]
pub struct ExtractionEngine {
    registry: FieldRegistry,
}

impl ExtractionEngine {
    /// Compile the registry from configuration.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let registry = FieldRegistry::from_config(config)?;
        info!("Compiled {} field rules", registry.len());
        Ok(Self { registry })
    }

    /// Engine over the default vocabularies.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(&ExtractionConfig::default())
    }

    /// Compile the registry from the `extraction` section of a config file.
    pub fn from_config_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RcptConfig = serde_json::from_str(&content)?;
        Ok(Self::new(&config.extraction)?)
    }

    /// Engine over a prebuilt registry.
    pub fn with_registry(registry: FieldRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Extract every field the registry knows from `text`.
    ///
    /// A rule that does not match leaves its field out. A rule whose match
    /// cannot be parsed also leaves its field out and adds a
    /// [`FieldFailure`]; other fields are unaffected.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut result = ExtractionResult::default();

        for rule in &self.registry {
            let outcome = rule.apply(text);

            if outcome.is_no_match() {
                trace!("{}: no match", rule.name());
                continue;
            }

            for failure in &outcome.failures {
                warn!("Dropping capture: {}", failure);
                result.failures.push(FieldFailure::from(failure));
            }

            if let Some(value) = outcome.value {
                debug!("{}: {}", rule.name(), value.display());
                result.fields.insert(rule.name().to_string(), value);
            }
        }

        info!(
            "Extracted {} fields ({} failed) from {} characters in {:?}",
            result.len(),
            result.failures.len(),
            text.len(),
            start.elapsed()
        );

        result
    }

    /// Read `path` through `source` and extract from its text.
    pub fn extract_file(
        &self,
        source: &dyn TextSource,
        path: &Path,
    ) -> crate::Result<ExtractionResult> {
        let text = source.read_text(path)?;
        Ok(self.extract(&text))
    }
}

impl ReceiptExtractor for ExtractionEngine {
    fn extract(&self, text: &str) -> ExtractionResult {
        ExtractionEngine::extract(self, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::registry::FieldRule;
    use crate::fields::{FieldKind, RuleCompiler};
    use crate::models::receipt::{FieldValue, LineItem, Money};
    use crate::{CurrencyCode, ExtractionError, PlainTextSource, RcptError, SourceError};
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn engine() -> ExtractionEngine {
        ExtractionEngine::with_defaults().unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn money(currency: &str, amount: &str) -> FieldValue {
        FieldValue::Amount(Money {
            currency: CurrencyCode::new(currency),
            amount: dec(amount),
        })
    }

    const RECEIPT: &str = r#"
        SUNRISE PETROLEUM, Highway 9
        Tax Invoice #: SP-20931
        Date: 12/03/2024  14:05
        40 LTR Diesel 3,680.00
        GST @ 184.00
        Grand Total: ₹ 3,864.00
        Paid By: UPI
    "#;

    #[test]
    fn test_extract_full_receipt() {
        let result = engine().extract(RECEIPT);

        assert_eq!(result.get("amount"), Some(&money("INR", "3864.00")));
        assert_eq!(result.get("date"), Some(&FieldValue::Text("12/03/2024".into())));
        assert_eq!(result.get("shopName"), Some(&FieldValue::Text("SUNRISE".into())));
        assert_eq!(
            result.get("items"),
            Some(&FieldValue::Item(LineItem {
                quantity: 40,
                unit: "LTR".into(),
                description: "Diesel".into(),
                price: dec("3680.00"),
            }))
        );
        assert_eq!(result.get("tax"), Some(&FieldValue::Text("GST: 184.00".into())));
        assert_eq!(
            result.get("invoiceNumber"),
            Some(&FieldValue::Text("SP-20931".into()))
        );
        assert_eq!(result.get("paymentMethod"), Some(&FieldValue::Text("UPI".into())));
        assert!(result.failures.is_empty());
    }

    #[test]
    fn test_amount_symbol() {
        let result = engine().extract("Total: $1,234.56");
        assert_eq!(result.get("amount"), Some(&money("USD", "1234.56")));
    }

    #[test]
    fn test_amount_code() {
        let result = engine().extract("Grand Total INR 999");
        assert_eq!(result.get("amount"), Some(&money("INR", "999")));
    }

    #[test]
    fn test_shop_name() {
        let result = engine().extract("ACME PETROLEUM, Receipt #123");
        assert_eq!(result.get("shopName"), Some(&FieldValue::Text("ACME".into())));
    }

    #[test]
    fn test_invoice_number() {
        let result = engine().extract("Invoice #: AB-4567");
        assert_eq!(
            result.get("invoiceNumber"),
            Some(&FieldValue::Text("AB-4567".into()))
        );
    }

    #[test]
    fn test_each_date_shape_returns_exact_substring() {
        for raw in ["7-11-23", "07/11/2023", "7 Nov 2023", "2023-11-07"] {
            let result = engine().extract(&format!("Visit on {} thanks", raw));
            assert_eq!(result.get("date"), Some(&FieldValue::Text(raw.into())), "{raw}");
        }
    }

    #[test]
    fn test_absent_fields_have_no_key() {
        let result = engine().extract("hello world, nothing to see");
        assert!(result.is_empty());
        assert!(result.failures.is_empty());
        for kind in FieldKind::ALL {
            assert!(!result.contains(kind.as_str()));
        }
        assert_eq!(result.to_json(), serde_json::json!({}));
    }

    #[test]
    fn test_only_matching_fields_present() {
        let result = engine().extract("Invoice #: AB-4567");
        let keys: Vec<&str> = result.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["invoiceNumber"]);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let engine = engine();
        assert_eq!(engine.extract(RECEIPT), engine.extract(RECEIPT));
    }

    #[test]
    fn test_parse_failure_is_isolated() {
        let text = "Total: 1.234,56\nDate: 15/03/2024\nInvoice #: INV-001\nPayment: Cash";
        let result = engine().extract(text);

        assert!(!result.contains("amount"));
        assert!(result.failed("amount"));
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.get("date"), Some(&FieldValue::Text("15/03/2024".into())));
        assert_eq!(
            result.get("invoiceNumber"),
            Some(&FieldValue::Text("INV-001".into()))
        );
        assert_eq!(result.get("paymentMethod"), Some(&FieldValue::Text("Cash".into())));
    }

    #[test]
    fn test_custom_rule_failure_is_isolated() {
        let config = ExtractionConfig::default();
        let compiler = RuleCompiler::new(&config).unwrap();
        let failing = FieldRule::new(
            "loyaltyPoints",
            vec!["points".into()],
            Regex::new(r"(?i)points:\s*(\w+)").unwrap(),
            1,
            |caps| {
                Err(ExtractionError::MalformedCapture {
                    field: "loyaltyPoints".into(),
                    value: caps[1].to_string(),
                    reason: "always fails".into(),
                })
            },
        )
        .unwrap();
        let registry = FieldRegistry::from_rules(vec![
            failing,
            compiler.compile(FieldKind::InvoiceNumber).unwrap(),
        ])
        .unwrap();

        let result = ExtractionEngine::with_registry(registry)
            .extract("Points: many\nReceipt #: R-778");

        assert_eq!(result.get("invoiceNumber"), Some(&FieldValue::Text("R-778".into())));
        assert!(result.failed("loyaltyPoints"));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_custom_vocabulary() {
        let mut config = ExtractionConfig::default();
        config.shop.suffixes = vec!["BAKERY".into()];
        config.payment.methods = vec!["Voucher".into()];

        let result = ExtractionEngine::new(&config)
            .unwrap()
            .extract("Le Petit BAKERY\nACME MART\nPayment: voucher");

        assert_eq!(result.get("shopName"), Some(&FieldValue::Text("Le Petit".into())));
        assert_eq!(result.get("paymentMethod"), Some(&FieldValue::Text("Voucher".into())));
    }

    #[test]
    fn test_multiple_items() {
        let mut config = ExtractionConfig::default();
        config.items.multiple_items = true;

        let result = ExtractionEngine::new(&config)
            .unwrap()
            .extract("1 KG Sugar 1.10\n2 PCS Bread 2.40\n");

        let items = result.get("items").and_then(FieldValue::as_list).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_item().unwrap().description, "Sugar");
    }

    #[test]
    fn test_config_error_at_construction() {
        let mut config = ExtractionConfig::default();
        config.amount.thousand_separators = vec!['.', ','];

        let err = ExtractionEngine::new(&config).unwrap_err();
        assert!(matches!(err, ConfigError::SeparatorConflict('.')));
    }

    #[test]
    fn test_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "extraction": { "payment": { "methods": ["Voucher"] } } }"#)
            .unwrap();

        let engine = ExtractionEngine::from_config_file(&path).unwrap();
        let result = engine.extract("Paid By: Voucher");
        assert_eq!(result.get("paymentMethod"), Some(&FieldValue::Text("Voucher".into())));
    }

    #[test]
    fn test_from_config_file_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = ExtractionEngine::from_config_file(&dir.path().join("none.json"));
        assert!(matches!(missing, Err(RcptError::Io(_))));

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, "{ not json").unwrap();
        let err = ExtractionEngine::from_config_file(&garbled).unwrap_err();
        assert!(matches!(err, RcptError::Json(_)));

        let conflicting = dir.path().join("conflict.json");
        std::fs::write(
            &conflicting,
            r#"{ "extraction": { "amount": { "thousand_separators": ["."] } } }"#,
        )
        .unwrap();
        let err = ExtractionEngine::from_config_file(&conflicting).unwrap_err();
        assert!(matches!(err, RcptError::Config(ConfigError::SeparatorConflict('.'))));
    }

    #[test]
    fn test_extract_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.txt");
        std::fs::write(&path, RECEIPT).unwrap();

        let result = engine().extract_file(&PlainTextSource::new(), &path).unwrap();
        assert_eq!(result, engine().extract(RECEIPT));

        let err = engine()
            .extract_file(&PlainTextSource::new(), &dir.path().join("scan.png"))
            .unwrap_err();
        assert!(matches!(err, RcptError::Source(SourceError::Unsupported(_))));
    }

    #[test]
    fn test_concurrent_extract() {
        let engine = Arc::new(engine());
        let expected = engine.extract(RECEIPT);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let engine = Arc::clone(&engine);
                    scope.spawn(move || engine.extract(RECEIPT))
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_trait_object() {
        let extractor: Box<dyn ReceiptExtractor> = Box::new(engine());
        assert!(extractor.extract("Paid By Cash").contains("paymentMethod"));
    }
}
