//! Extracted receipt data.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::fields::CurrencyCode;

/// A monetary amount with the currency it was written in, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    /// Canonical currency code; `None` when no known token was next to it.
    pub currency: Option<CurrencyCode>,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// A single receipt line: quantity, unit, description and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub quantity: u32,

    /// Unit of measure, in its configured spelling.
    pub unit: String,

    pub description: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Value of one extracted field. The shape depends on the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// `amount`
    Amount(Money),
    /// `items`
    Item(LineItem),
    /// `date`, `shopName`, `tax`, `invoiceNumber`, `paymentMethod`
    Text(String),
    /// Every match of a rule that collects all occurrences.
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<&Money> {
        match self {
            FieldValue::Amount(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&LineItem> {
        match self {
            FieldValue::Item(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// One-line rendering for text output.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Amount(m) => match &m.currency {
                Some(code) => format!("{} {}", code, m.amount),
                None => m.amount.to_string(),
            },
            FieldValue::Item(i) => {
                format!("{} {} {} @ {}", i.quantity, i.unit, i.description, i.price)
            }
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(values) => values
                .iter()
                .map(FieldValue::display)
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// A field whose rule matched but whose capture could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    pub field: String,
    pub message: String,
}

impl From<&ExtractionError> for FieldFailure {
    fn from(err: &ExtractionError) -> Self {
        Self {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of running the registry over one text.
///
/// Only fields that matched and parsed are present; a missing key means
/// "not found", never "found empty".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted values keyed by field name.
    pub fields: BTreeMap<String, FieldValue>,

    /// Fields dropped because their capture could not be parsed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FieldFailure>,
}

impl ExtractionResult {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the named field matched but failed to parse.
    pub fn failed(&self, field: &str) -> bool {
        self.failures.iter().any(|f| f.field == field)
    }

    /// Flat `{ field: value }` object for downstream consumers.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.fields).unwrap_or_default()
    }
}
