//! Builds field rules from configuration vocabularies.
//!
//! Each `*_rule` method writes the pattern for one [`FieldKind`] and the
//! parser that reads it in the same place, so the group layout is stated
//! once. [`FieldRule::new`] then checks the count against the compiled
//! pattern.

use std::sync::Arc;

use regex::{Captures, Regex, RegexBuilder};

use crate::error::{ConfigError, ExtractionError};
use crate::models::config::ExtractionConfig;
use crate::models::receipt::{FieldValue, LineItem, Money};

use super::FieldKind;
use super::currency::CurrencyTable;
use super::numbers::NumberFormat;
use super::registry::FieldRule;

/// Joins the words of a multi-word keyword in the generated pattern.
const WORD_GAP: &str = r"\s+";

/// Compiles one [`FieldRule`] per field kind.
pub struct RuleCompiler<'a> {
    config: &'a ExtractionConfig,
    currencies: Arc<CurrencyTable>,
    numbers: NumberFormat,
}

impl<'a> RuleCompiler<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Result<Self, ConfigError> {
        let currencies = CurrencyTable::new(&config.amount.currencies)?;
        let numbers = NumberFormat::new(
            config.amount.decimal_convention,
            &config.amount.thousand_separators,
        )?;

        Ok(Self {
            config,
            currencies: Arc::new(currencies),
            numbers,
        })
    }

    pub fn currencies(&self) -> &CurrencyTable {
        &self.currencies
    }

    pub fn numbers(&self) -> &NumberFormat {
        &self.numbers
    }

    /// All rules, in registry order.
    pub fn compile_all(&self) -> Result<Vec<FieldRule>, ConfigError> {
        FieldKind::ALL.into_iter().map(|kind| self.compile(kind)).collect()
    }

    pub fn compile(&self, kind: FieldKind) -> Result<FieldRule, ConfigError> {
        match kind {
            FieldKind::Amount => self.amount_rule(),
            FieldKind::Date => self.date_rule(),
            FieldKind::ShopName => self.shop_name_rule(),
            FieldKind::Items => self.items_rule(),
            FieldKind::Tax => self.tax_rule(),
            FieldKind::InvoiceNumber => self.invoice_number_rule(),
            FieldKind::PaymentMethod => self.payment_method_rule(),
        }
    }

    /// `<keyword>[: ]<currency>? <number> <currency>?`
    ///
    /// Groups: 1 leading currency, 2 number, 3 trailing currency. The
    /// leading currency wins when both resolve.
    pub fn amount_rule(&self) -> Result<FieldRule, ConfigError> {
        let name = FieldKind::Amount.as_str();
        let keywords = alternation(name, "keyword", &self.config.amount.keywords, WORD_GAP)?;
        let currencies = self
            .currencies
            .tokens()
            .into_iter()
            .map(currency_token)
            .collect::<Vec<_>>()
            .join("|");
        if currencies.is_empty() {
            return Err(ConfigError::EmptyList {
                field: name.to_string(),
                list: "currency",
            });
        }
        let number = self.numbers.pattern();

        let pattern = compile(
            name,
            &format!(
                r"\b(?:{keywords})[\s:]*(?:({currencies})\s*)?({number})(?:\s*({currencies}))?"
            ),
        )?;

        let table = Arc::clone(&self.currencies);
        let numbers = self.numbers.clone();
        FieldRule::new(name, self.config.amount.keywords.clone(), pattern, 3, move |caps| {
            let currency = [caps.get(1), caps.get(3)]
                .into_iter()
                .flatten()
                .find_map(|m| table.resolve_matched(m.as_str()))
                .cloned();
            let raw = group(caps, 2, name)?;
            let amount = numbers.parse(raw).map_err(|e| malformed(name, raw, e))?;
            Ok(FieldValue::Amount(Money { currency, amount }))
        })
    }

    /// `D-M-Y`, `D Mon Y` or `Y-M-D`; the raw match is the value.
    pub fn date_rule(&self) -> Result<FieldRule, ConfigError> {
        let name = FieldKind::Date.as_str();
        let date = &self.config.date;
        if date.separators.is_empty() {
            return Err(ConfigError::EmptyList {
                field: name.to_string(),
                list: "separator",
            });
        }
        let sep = char_class(&date.separators);
        let months = alternation(name, "month", &date.month_names, WORD_GAP)?;

        let pattern = compile(
            name,
            &[
                format!(r"\b[0-9]{{1,2}}[{sep}][0-9]{{1,2}}[{sep}][0-9]{{2,4}}\b"),
                format!(r"\b[0-9]{{1,2}}\s*(?:{months})[a-z]*\.?\s*[0-9]{{2,4}}\b"),
                format!(r"\b[0-9]{{4}}[{sep}][0-9]{{1,2}}[{sep}][0-9]{{1,2}}\b"),
            ]
            .join("|"),
        )?;

        FieldRule::new(name, date.month_names.clone(), pattern, 0, move |caps| {
            Ok(FieldValue::Text(group(caps, 0, name)?.to_string()))
        })
    }

    /// Start of a line up to the first business suffix on it.
    ///
    /// Group 1 is the name. The first line carrying a suffix wins, so a
    /// receipt with several business-like lines reports the topmost one.
    pub fn shop_name_rule(&self) -> Result<FieldRule, ConfigError> {
        let name = FieldKind::ShopName.as_str();
        let suffixes = alternation(name, "suffix", &self.config.shop.suffixes, WORD_GAP)?;

        let pattern = compile(
            name,
            &format!(r"(?m)^[ \t]*(.*?)[ \t]*[,\-]?[ \t]*\b(?:{suffixes})\b"),
        )?;

        FieldRule::new(name, self.config.shop.suffixes.clone(), pattern, 1, move |caps| {
            let shop = group(caps, 1, name)?
                .trim()
                .trim_end_matches([',', '-'])
                .trim_end();
            if shop.is_empty() {
                return Err(ExtractionError::EmptyCapture {
                    field: name.to_string(),
                });
            }
            Ok(FieldValue::Text(shop.to_string()))
        })
    }

    /// `<qty> <unit> <description> <price>` on one line, price last.
    ///
    /// Groups: 1 quantity, 2 unit, 3 description, 4 price. Only the first
    /// line item is reported unless `multiple_items` is set.
    pub fn items_rule(&self) -> Result<FieldRule, ConfigError> {
        let name = FieldKind::Items.as_str();
        let items = &self.config.items;
        let units = alternation(name, "unit", &items.units, WORD_GAP)?;
        let price = self.numbers.inline_pattern();

        let pattern = compile(
            name,
            &format!(
                r"(?m)\b([0-9]+)[ \t]*({units})\b[ \t]+([^\r\n]+?)[ \t]+({price})[ \t\r]*$"
            ),
        )?;

        let vocabulary = items.units.clone();
        let numbers = self.numbers.clone();
        let rule = FieldRule::new(name, items.units.clone(), pattern, 4, move |caps| {
            let raw_quantity = group(caps, 1, name)?;
            let quantity = raw_quantity
                .parse::<u32>()
                .map_err(|e| malformed(name, raw_quantity, e))?;
            let unit = canonical(&vocabulary, group(caps, 2, name)?);
            let description = group(caps, 3, name)?.trim().to_string();
            let raw_price = group(caps, 4, name)?;
            let price = numbers
                .parse(raw_price)
                .map_err(|e| malformed(name, raw_price, e))?;

            Ok(FieldValue::Item(LineItem {
                quantity,
                unit,
                description,
                price,
            }))
        })?;

        Ok(rule.with_all_matches(items.multiple_items))
    }

    /// `<identifier>[: @]<number>`, rendered as `"{identifier}: {value}"`.
    pub fn tax_rule(&self) -> Result<FieldRule, ConfigError> {
        let name = FieldKind::Tax.as_str();
        let identifiers = alternation(name, "identifier", &self.config.tax.identifiers, WORD_GAP)?;
        let number = self.numbers.inline_pattern();

        let pattern = compile(name, &format!(r"\b({identifiers})[\s:@]*({number})"))?;

        FieldRule::new(name, self.config.tax.identifiers.clone(), pattern, 2, move |caps| {
            let identifier = collapse_whitespace(group(caps, 1, name)?);
            let value = group(caps, 2, name)?;
            Ok(FieldValue::Text(format!("{}: {}", identifier, value)))
        })
    }

    /// `<prefix>[ #:-]<token>` where the token is letters, digits and
    /// hyphens, at least `min_length` long.
    pub fn invoice_number_rule(&self) -> Result<FieldRule, ConfigError> {
        let name = FieldKind::InvoiceNumber.as_str();
        let invoice = &self.config.invoice;
        let prefixes = alternation(name, "prefix", &invoice.prefixes, WORD_GAP)?;
        let min = invoice.min_length.max(1);

        let pattern = compile(
            name,
            &format!(r"\b(?:{prefixes})[ \t#:\-]*([A-Z0-9\-]{{{min},}})"),
        )?;

        FieldRule::new(name, invoice.prefixes.clone(), pattern, 1, move |caps| {
            Ok(FieldValue::Text(group(caps, 1, name)?.to_string()))
        })
    }

    /// `Payment` / `Paid By` followed by a configured method name.
    pub fn payment_method_rule(&self) -> Result<FieldRule, ConfigError> {
        let name = FieldKind::PaymentMethod.as_str();
        let payment = &self.config.payment;
        let leads = alternation(name, "lead phrase", &payment.lead_phrases, r"\s*")?;
        let methods = alternation(name, "method", &payment.methods, WORD_GAP)?;

        let pattern = compile(
            name,
            &format!(r"\b(?:{leads})[\s:\-]*({methods})\b"),
        )?;

        let vocabulary = payment.methods.clone();
        FieldRule::new(name, payment.methods.clone(), pattern, 1, move |caps| {
            Ok(FieldValue::Text(canonical(&vocabulary, group(caps, 1, name)?)))
        })
    }
}

/// Case-insensitive compile, tagging errors with the field name.
fn compile(field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::Pattern {
            field: field.to_string(),
            source,
        })
}

/// Alternation of escaped words, longest first so `grand total` is tried
/// before `total` and `KGS` before `KG`.
fn alternation(
    field: &str,
    list: &'static str,
    words: &[String],
    gap: &str,
) -> Result<String, ConfigError> {
    let mut words: Vec<&str> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return Err(ConfigError::EmptyList {
            field: field.to_string(),
            list,
        });
    }
    words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    words.dedup_by(|a, b| a.eq_ignore_ascii_case(b));

    Ok(words
        .iter()
        .map(|w| {
            w.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(gap)
        })
        .collect::<Vec<_>>()
        .join("|"))
}

fn char_class(chars: &[char]) -> String {
    chars
        .iter()
        .map(|c| regex::escape(&c.to_string()))
        .collect()
}

/// Letter codes must end at a word boundary so `RM` never matches `RMB`.
fn currency_token(token: &str) -> String {
    let escaped = regex::escape(token);
    match token.chars().last() {
        Some(c) if c.is_alphanumeric() => format!(r"{escaped}\b"),
        _ => escaped,
    }
}

fn group<'t>(caps: &Captures<'t>, index: usize, field: &str) -> Result<&'t str, ExtractionError> {
    caps.get(index)
        .map(|m| m.as_str())
        .ok_or_else(|| ExtractionError::MissingGroup {
            field: field.to_string(),
            group: index,
        })
}

fn malformed(field: &str, value: &str, reason: impl ToString) -> ExtractionError {
    ExtractionError::MalformedCapture {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Configured spelling of a case-insensitively matched word.
fn canonical(vocabulary: &[String], matched: &str) -> String {
    let matched = collapse_whitespace(matched);
    vocabulary
        .iter()
        .find(|w| collapse_whitespace(w).eq_ignore_ascii_case(&matched))
        .map(|w| w.trim().to_string())
        .unwrap_or(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::numbers::DecimalConvention;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rule(kind: FieldKind) -> FieldRule {
        let config = ExtractionConfig::default();
        RuleCompiler::new(&config).unwrap().compile(kind).unwrap()
    }

    fn value(kind: FieldKind, text: &str) -> Option<FieldValue> {
        rule(kind).apply(text).value
    }

    fn text_of(kind: FieldKind, input: &str) -> Option<String> {
        value(kind, input).and_then(|v| v.as_text().map(str::to_string))
    }

    #[test]
    fn test_every_rule_declares_its_groups() {
        let config = ExtractionConfig::default();
        let rules = RuleCompiler::new(&config).unwrap().compile_all().unwrap();

        let groups: Vec<(&str, usize)> = rules
            .iter()
            .map(|r| (r.name(), r.pattern().captures_len() - 1))
            .collect();
        assert_eq!(
            groups,
            vec![
                ("amount", 3),
                ("date", 0),
                ("shopName", 1),
                ("items", 4),
                ("tax", 2),
                ("invoiceNumber", 1),
                ("paymentMethod", 1),
            ]
        );
        for r in &rules {
            assert_eq!(r.groups(), r.pattern().captures_len() - 1);
        }
    }

    #[test]
    fn test_amount_leading_symbol() {
        let money = value(FieldKind::Amount, "Total: $1,234.56").unwrap();
        assert_eq!(
            money.as_money().unwrap(),
            &Money {
                currency: crate::CurrencyCode::new("USD"),
                amount: dec("1234.56"),
            }
        );
    }

    #[test]
    fn test_amount_leading_code() {
        let money = value(FieldKind::Amount, "Grand Total INR 999").unwrap();
        let money = money.as_money().unwrap();
        assert_eq!(money.currency.as_ref().unwrap(), &"INR");
        assert_eq!(money.amount, dec("999"));
    }

    #[test]
    fn test_amount_trailing_code() {
        let money = value(FieldKind::Amount, "Amount: 45.00 eur").unwrap();
        let money = money.as_money().unwrap();
        assert_eq!(money.currency.as_ref().unwrap(), &"EUR");
        assert_eq!(money.amount, dec("45.00"));
    }

    #[test]
    fn test_amount_prefers_longer_currency_token() {
        let money = value(FieldKind::Amount, "TOTAL S$ 12.90").unwrap();
        assert_eq!(money.as_money().unwrap().currency.as_ref().unwrap(), &"SGD");
    }

    #[test]
    fn test_amount_without_currency() {
        let money = value(FieldKind::Amount, "Subtotal 80").unwrap();
        assert_eq!(
            money.as_money().unwrap(),
            &Money {
                currency: None,
                amount: dec("80"),
            }
        );
    }

    #[test]
    fn test_amount_comma_convention() {
        let mut config = ExtractionConfig::default();
        config.amount.decimal_convention = DecimalConvention::Comma;
        config.amount.thousand_separators = vec!['.', ' '];
        let rule = RuleCompiler::new(&config).unwrap().amount_rule().unwrap();

        let money = rule.apply("Total: 1.234,56 €").value.unwrap();
        let money = money.as_money().unwrap();
        assert_eq!(money.amount, dec("1234.56"));
        assert_eq!(money.currency.as_ref().unwrap(), &"EUR");
    }

    #[test]
    fn test_amount_conflicting_separators_fail() {
        let outcome = rule(FieldKind::Amount).apply("Total: 1.234,56");
        assert_eq!(outcome.value, None);
        assert!(matches!(
            outcome.failures.as_slice(),
            [ExtractionError::MalformedCapture { field, .. }] if field == "amount"
        ));
    }

    #[test]
    fn test_amount_stops_before_next_number() {
        let cases = [
            ("Total 1,250.00 1,250.00", "1250.00"),
            ("Total: 45.00 12:30", "45.00"),
            ("TOTAL 4 45.00", "4"),
            ("Grand Total: 1 234.56", "1234.56"),
        ];
        for (text, expected) in cases {
            let outcome = rule(FieldKind::Amount).apply(text);
            assert_eq!(outcome.failures, vec![], "{text}");
            let money = outcome.value.unwrap();
            assert_eq!(money.as_money().unwrap().amount, dec(expected), "{text}");
        }
    }

    #[test]
    fn test_amount_code_must_be_whole_word() {
        let money = value(FieldKind::Amount, "Total 12.00 RMB").unwrap();
        let money = money.as_money().unwrap();
        assert_eq!(money.currency, None);
        assert_eq!(money.amount, dec("12.00"));

        let money = value(FieldKind::Amount, "Total RM 12.00").unwrap();
        assert_eq!(money.as_money().unwrap().currency.as_ref().unwrap(), &"MYR");
    }

    #[test]
    fn test_amount_leading_decimal() {
        let money = value(FieldKind::Amount, "Total: $.50").unwrap();
        assert_eq!(
            money.as_money().unwrap(),
            &Money {
                currency: crate::CurrencyCode::new("USD"),
                amount: dec("0.50"),
            }
        );
    }

    #[test]
    fn test_date_shapes_return_raw_match() {
        for raw in ["15-03-2024", "5/3/24", "15.01.2024", "15 Mar 2024", "1 September 2023", "2024-03-15", "2024/3/5"] {
            let found = text_of(FieldKind::Date, &format!("Date: {} 10:42", raw));
            assert_eq!(found.as_deref(), Some(raw), "shape {raw}");
        }
    }

    #[test]
    fn test_date_absent() {
        assert_eq!(value(FieldKind::Date, "Total 12.50"), None);
    }

    #[test]
    fn test_shop_name_before_suffix() {
        assert_eq!(
            text_of(FieldKind::ShopName, "ACME PETROLEUM, Receipt #123").as_deref(),
            Some("ACME")
        );
        assert_eq!(
            text_of(FieldKind::ShopName, "\n  Green Valley - Supermarket\nTotal 10").as_deref(),
            Some("Green Valley")
        );
    }

    #[test]
    fn test_shop_name_suffix_must_be_a_word() {
        assert_eq!(
            text_of(FieldKind::ShopName, "GASTON FOODS STORE").as_deref(),
            Some("GASTON FOODS")
        );
    }

    #[test]
    fn test_shop_name_empty_prefix_fails() {
        let outcome = rule(FieldKind::ShopName).apply("STORE #42");
        assert_eq!(outcome.value, None);
        assert!(matches!(
            outcome.failures.as_slice(),
            [ExtractionError::EmptyCapture { .. }]
        ));
    }

    #[test]
    fn test_items_first_line_item() {
        let receipt = "ACME MART\n2 KG Basmati Rice 5.40\n3 PCS Soap 1.20\n";
        let item = value(FieldKind::Items, receipt).unwrap();
        assert_eq!(
            item.as_item().unwrap(),
            &LineItem {
                quantity: 2,
                unit: "KG".into(),
                description: "Basmati Rice".into(),
                price: dec("5.40"),
            }
        );
    }

    #[test]
    fn test_items_unit_prefers_longest() {
        let item = value(FieldKind::Items, "5 kgs Onions 3.00").unwrap();
        let item = item.as_item().unwrap();
        assert_eq!(item.unit, "KGS");
        assert_eq!(item.description, "Onions");
    }

    #[test]
    fn test_items_all_matches() {
        let mut config = ExtractionConfig::default();
        config.items.multiple_items = true;
        let rule = RuleCompiler::new(&config).unwrap().items_rule().unwrap();

        let receipt = "2 KG Basmati Rice 5.40\nthank you\n3 PCS Soap 1.20\r\n10 L Diesel 1,050.00";
        let items = rule.apply(receipt).value.unwrap();
        let items = items.as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].as_item().unwrap().description, "Soap");
        assert_eq!(items[2].as_item().unwrap().price, dec("1050.00"));
    }

    #[test]
    fn test_tax_renders_identifier_and_value() {
        assert_eq!(text_of(FieldKind::Tax, "GST: 12.50").as_deref(), Some("GST: 12.50"));
        assert_eq!(
            text_of(FieldKind::Tax, "Sales   Tax @ 3.25").as_deref(),
            Some("Sales Tax: 3.25")
        );
    }

    #[test]
    fn test_invoice_number() {
        assert_eq!(
            text_of(FieldKind::InvoiceNumber, "Invoice #: AB-4567").as_deref(),
            Some("AB-4567")
        );
        assert_eq!(
            text_of(FieldKind::InvoiceNumber, "Bill No: 00912").as_deref(),
            Some("00912")
        );
        assert_eq!(value(FieldKind::InvoiceNumber, "Invoice #: 12"), None);
    }

    #[test]
    fn test_invoice_number_stays_on_prefix_line() {
        assert_eq!(value(FieldKind::InvoiceNumber, "RECEIPT\nDate: 12/03/2024"), None);
        assert_eq!(
            text_of(FieldKind::InvoiceNumber, "Receipt\t# R-0042\nDate: 12/03/2024").as_deref(),
            Some("R-0042")
        );
    }

    #[test]
    fn test_payment_method_canonical_spelling() {
        assert_eq!(
            text_of(FieldKind::PaymentMethod, "Paid By: credit card").as_deref(),
            Some("Credit Card")
        );
        assert_eq!(
            text_of(FieldKind::PaymentMethod, "PAYMENT - CASH").as_deref(),
            Some("Cash")
        );
        assert_eq!(
            text_of(FieldKind::PaymentMethod, "PaidBy UPI").as_deref(),
            Some("UPI")
        );
        assert_eq!(value(FieldKind::PaymentMethod, "Paid By: Bitcoin"), None);
    }

    #[test]
    fn test_empty_vocabulary_is_config_error() {
        let mut config = ExtractionConfig::default();
        config.tax.identifiers.clear();

        let err = RuleCompiler::new(&config).unwrap().tax_rule().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyList { list: "identifier", .. }));
    }

    #[test]
    fn test_keywords_are_escaped() {
        let mut config = ExtractionConfig::default();
        config.invoice.prefixes = vec!["Ref.(No)".into()];
        let rule = RuleCompiler::new(&config).unwrap().invoice_number_rule().unwrap();

        assert_eq!(
            rule.apply("Ref.(No) XY-900").value,
            Some(FieldValue::Text("XY-900".into()))
        );
        assert_eq!(rule.apply("RefX(No) XY-900").value, None);
    }
}
