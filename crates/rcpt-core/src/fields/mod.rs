//! Pattern-driven field extraction.
//!
//! Each extractable field is a [`FieldRule`]: a compiled pattern paired with
//! the parser that reads its capture groups. The [`RuleCompiler`] builds one
//! rule per [`FieldKind`] from an [`ExtractionConfig`](crate::ExtractionConfig),
//! the [`FieldRegistry`] keeps them in attempt order and the
//! [`ExtractionEngine`] applies them to raw OCR text.

pub mod compiler;
pub mod currency;
pub mod dates;
pub mod engine;
pub mod numbers;
pub mod registry;

pub use compiler::RuleCompiler;
pub use currency::{CurrencyCode, CurrencyTable};
pub use dates::normalize_date;
pub use engine::{ExtractionEngine, ReceiptExtractor};
pub use numbers::{DecimalConvention, NumberError, NumberFormat};
pub use registry::{FieldParser, FieldRegistry, FieldRule, RuleOutcome};

use serde::{Deserialize, Serialize};

/// The field kinds the default registry knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Amount,
    Date,
    ShopName,
    Items,
    Tax,
    InvoiceNumber,
    PaymentMethod,
}

impl FieldKind {
    /// All kinds, in registry order.
    pub const ALL: [FieldKind; 7] = [
        FieldKind::Amount,
        FieldKind::Date,
        FieldKind::ShopName,
        FieldKind::Items,
        FieldKind::Tax,
        FieldKind::InvoiceNumber,
        FieldKind::PaymentMethod,
    ];

    /// Output key used in the extraction result.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Amount => "amount",
            FieldKind::Date => "date",
            FieldKind::ShopName => "shopName",
            FieldKind::Items => "items",
            FieldKind::Tax => "tax",
            FieldKind::InvoiceNumber => "invoiceNumber",
            FieldKind::PaymentMethod => "paymentMethod",
        }
    }

    /// Look up a kind by its output key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_kind_names_round_trip() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(FieldKind::from_name("total"), None);
    }

    #[test]
    fn test_field_kind_serializes_as_output_key() {
        let json = serde_json::to_string(&FieldKind::InvoiceNumber).unwrap();
        assert_eq!(json, "\"invoiceNumber\"");
    }
}
