//! Currency token resolution.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Canonical three-letter currency code (ISO 4217 style).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a code, accepting only three ASCII upper-case letters.
    pub fn new(code: &str) -> Option<Self> {
        let valid = code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase());
        valid.then(|| Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for CurrencyCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Default surface tokens and the code each one stands for.
pub const DEFAULT_CURRENCIES: &[(&str, &str)] = &[
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("₹", "INR"),
    ("¥", "JPY"),
    ("RM", "MYR"),
    ("S$", "SGD"),
];

/// Static mapping from currency token (symbol or code) to canonical code.
///
/// Every canonical code is also a token for itself, so `$` and `USD` both
/// resolve to `USD`. Lookup is exact; case folding is left to the patterns
/// built from [`CurrencyTable::tokens`].
#[derive(Debug, Clone)]
pub struct CurrencyTable {
    entries: BTreeMap<String, CurrencyCode>,
}

impl CurrencyTable {
    /// Build a table from a `token -> code` map.
    pub fn new(map: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();

        for (token, code) in map {
            let canonical =
                CurrencyCode::new(code).ok_or_else(|| ConfigError::InvalidCurrency {
                    token: token.clone(),
                    code: code.clone(),
                })?;
            entries.insert(code.clone(), canonical.clone());
            entries.insert(token.clone(), canonical);
        }

        Ok(Self { entries })
    }

    /// Resolve a token exactly as written.
    pub fn resolve(&self, token: &str) -> Option<&CurrencyCode> {
        self.entries.get(token)
    }

    /// Resolve a token captured by a case-insensitive pattern.
    ///
    /// Tries the token as written, then its ASCII upper-case form, so
    /// `usd` and `rm` resolve while symbols keep exact lookup.
    pub fn resolve_matched(&self, token: &str) -> Option<&CurrencyCode> {
        let token = token.trim();
        self.resolve(token)
            .or_else(|| self.resolve(&token.to_ascii_uppercase()))
    }

    /// All tokens, longest first, so alternations prefer `S$` over `$`.
    pub fn tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        tokens.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        tokens
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CurrencyTable {
    fn default() -> Self {
        let entries = DEFAULT_CURRENCIES
            .iter()
            .flat_map(|(token, code)| {
                let canonical = CurrencyCode(code.to_string());
                [
                    (token.to_string(), canonical.clone()),
                    (code.to_string(), canonical),
                ]
            })
            .collect();
        Self { entries }
    }
}

/// Default `token -> code` map, as stored in configuration files.
pub fn default_currency_map() -> BTreeMap<String, String> {
    DEFAULT_CURRENCIES
        .iter()
        .map(|(token, code)| (token.to_string(), code.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_and_code_resolve_alike() {
        let table = CurrencyTable::default();
        assert_eq!(table.resolve("$"), table.resolve("USD"));
        assert_eq!(table.resolve("$").unwrap(), &"USD");
        assert_eq!(table.resolve("S$").unwrap(), &"SGD");
        assert_eq!(table.resolve("RM").unwrap(), &"MYR");
        assert_eq!(table.resolve("₹").unwrap(), &"INR");
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let table = CurrencyTable::default();
        assert_eq!(table.resolve("usd"), None);
        assert_eq!(table.resolve("XYZ"), None);
        assert_eq!(table.resolve(""), None);
    }

    #[test]
    fn test_resolve_matched_folds_codes() {
        let table = CurrencyTable::default();
        assert_eq!(table.resolve_matched("usd").unwrap(), &"USD");
        assert_eq!(table.resolve_matched("Rm").unwrap(), &"MYR");
        assert_eq!(table.resolve_matched(" € ").unwrap(), &"EUR");
    }

    #[test]
    fn test_tokens_longest_first() {
        let table = CurrencyTable::default();
        let tokens = table.tokens();
        let sgd = tokens.iter().position(|t| *t == "S$").unwrap();
        let usd = tokens.iter().position(|t| *t == "$").unwrap();
        assert!(sgd < usd);
        assert_eq!(tokens.len(), 14);
    }

    #[test]
    fn test_new_matches_default() {
        let table = CurrencyTable::new(&default_currency_map()).unwrap();
        assert_eq!(table.len(), CurrencyTable::default().len());
        assert_eq!(table.resolve("¥").unwrap(), &"JPY");
        assert_eq!(table.resolve("JPY").unwrap(), &"JPY");
    }

    #[test]
    fn test_new_rejects_bad_code() {
        let mut map = BTreeMap::new();
        map.insert("kr".to_string(), "sek".to_string());

        let err = CurrencyTable::new(&map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCurrency { .. }));
    }
}
