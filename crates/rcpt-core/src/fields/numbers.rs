//! Numeric literal parsing with an explicit decimal convention.
//!
//! Receipts write `1,234.56` or `1.234,56` depending on locale, and both
//! separators can play either role. The convention is a configuration
//! input, never guessed per literal: a literal that contradicts it is an
//! error, not a silently different number.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConfigError;

/// Which character marks the decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalConvention {
    /// `1,234.56`
    Point,
    /// `1.234,56`
    Comma,
}

impl DecimalConvention {
    pub fn separator(&self) -> char {
        match self {
            DecimalConvention::Point => '.',
            DecimalConvention::Comma => ',',
        }
    }

    /// Thousand separators that pair with this convention.
    pub fn default_thousands(&self) -> Vec<char> {
        match self {
            DecimalConvention::Point => vec![',', ' '],
            DecimalConvention::Comma => vec!['.', ' '],
        }
    }
}

/// Errors from [`NumberFormat::parse`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumberError {
    #[error("no digits")]
    Empty,

    #[error("decimal separator {0:?} appears more than once")]
    RepeatedDecimal(char),

    #[error("separator after the decimal separator {0:?}")]
    MisplacedSeparator(char),

    #[error("thousand groups in {0:?} are not three digits")]
    BadGrouping(String),

    #[error("not a decimal number: {0}")]
    Invalid(String),
}

/// Separator roles used to read numeric literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    decimal: char,
    thousands: Vec<char>,
}

impl NumberFormat {
    /// Create a format; no character may serve both roles.
    pub fn new(convention: DecimalConvention, thousands: &[char]) -> Result<Self, ConfigError> {
        let decimal = convention.separator();
        if thousands.contains(&decimal) {
            return Err(ConfigError::SeparatorConflict(decimal));
        }

        Ok(Self {
            decimal,
            thousands: thousands.to_vec(),
        })
    }

    pub fn decimal(&self) -> char {
        self.decimal
    }

    pub fn thousands(&self) -> &[char] {
        &self.thousands
    }

    /// Every separator character, decimal first.
    pub fn separators(&self) -> Vec<char> {
        let mut all = vec![self.decimal];
        all.extend(self.thousands.iter().copied());
        all
    }

    /// Separators that never span whitespace (used inside table rows).
    pub fn inline_separators(&self) -> Vec<char> {
        self.separators()
            .into_iter()
            .filter(|c| !c.is_whitespace())
            .collect()
    }

    fn is_thousands(&self, c: char) -> bool {
        self.thousands.contains(&c)
    }

    /// Regex fragment for one literal in this format.
    ///
    /// A whitespace thousand separator only joins a group of three or more
    /// digits, so `45.00 12` or `4 45.00` end at the space. A bare fraction
    /// such as `.50` is a literal too.
    pub fn pattern(&self) -> String {
        let spaces: Vec<char> = self
            .thousands
            .iter()
            .copied()
            .filter(|c| c.is_whitespace())
            .collect();
        if spaces.is_empty() {
            return self.inline_pattern();
        }

        format!(
            r"[0-9]{{1,3}}(?:[{}][0-9]{{3,}})+{}|{}",
            char_class(&spaces),
            self.inline_tail(),
            self.inline_pattern()
        )
    }

    /// Like [`NumberFormat::pattern`], without whitespace separators.
    pub fn inline_pattern(&self) -> String {
        format!(
            r"[0-9]+{}|{}[0-9]+",
            self.inline_tail(),
            regex::escape(&self.decimal.to_string())
        )
    }

    fn inline_tail(&self) -> String {
        format!(r"(?:[{}][0-9]+)*", char_class(&self.inline_separators()))
    }

    /// Parse a captured numeric literal.
    ///
    /// Characters that are neither digits nor configured separators are
    /// dropped, as are separators at either end except a leading decimal
    /// separator (`.50`). Thousand groups after the first must have exactly
    /// three digits, and nothing but digits may follow the decimal
    /// separator.
    pub fn parse(&self, raw: &str) -> Result<Decimal, NumberError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == self.decimal || self.is_thousands(*c))
            .collect();
        let trimmed = cleaned
            .trim_end_matches(|c: char| !c.is_ascii_digit())
            .trim_start_matches(|c: char| self.is_thousands(c));
        if trimmed.is_empty() {
            return Err(NumberError::Empty);
        }

        let mut parts = trimmed.split(self.decimal);
        let integer = parts.next().unwrap_or_default();
        let fraction = parts.next();
        if parts.next().is_some() {
            return Err(NumberError::RepeatedDecimal(self.decimal));
        }

        if let Some(fraction) = fraction {
            if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
                return Err(NumberError::MisplacedSeparator(self.decimal));
            }
        }

        let groups: Vec<&str> = integer.split(|c| self.is_thousands(c)).collect();
        if groups.len() > 1 {
            let (head, tail) = groups.split_at(1);
            let head_ok = (1..=3).contains(&head[0].len());
            let tail_ok = tail.iter().all(|g| g.len() == 3);
            if !head_ok || !tail_ok {
                return Err(NumberError::BadGrouping(integer.to_string()));
            }
        }

        let mut digits = groups.concat();
        if digits.is_empty() {
            digits.push('0');
        }
        let literal = match fraction {
            Some(fraction) => format!("{}.{}", digits, fraction),
            None => digits,
        };

        Decimal::from_str(&literal).map_err(|e| NumberError::Invalid(e.to_string()))
    }
}

fn char_class(chars: &[char]) -> String {
    chars
        .iter()
        .map(|c| regex::escape(&c.to_string()))
        .collect()
}

impl Default for NumberFormat {
    fn default() -> Self {
        let convention = DecimalConvention::Point;
        Self {
            decimal: convention.separator(),
            thousands: convention.default_thousands(),
        }
    }
}
