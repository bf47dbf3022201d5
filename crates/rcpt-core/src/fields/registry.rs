//! Field rules and the ordered registry that holds them.

use std::collections::HashSet;
use std::fmt;

use regex::{Captures, Regex};

use crate::error::{ConfigError, ExtractionError};
use crate::models::config::ExtractionConfig;
use crate::models::receipt::FieldValue;

use super::compiler::RuleCompiler;

/// Parser turning one match of a rule's pattern into a field value.
pub type FieldParser =
    Box<dyn Fn(&Captures<'_>) -> Result<FieldValue, ExtractionError> + Send + Sync>;

/// Outcome of applying one rule to a text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleOutcome {
    /// Parsed value, if any match parsed.
    pub value: Option<FieldValue>,

    /// Matches that could not be parsed.
    pub failures: Vec<ExtractionError>,
}

impl RuleOutcome {
    /// The pattern did not match at all.
    pub fn is_no_match(&self) -> bool {
        self.value.is_none() && self.failures.is_empty()
    }
}

/// Definition of one extractable field.
///
/// The pattern and the parser are created together and the group count the
/// parser reads is checked against the compiled pattern, so a rule that
/// exists can never index a group its pattern lacks.
pub struct FieldRule {
    name: String,
    keywords: Vec<String>,
    pattern: Regex,
    groups: usize,
    all_matches: bool,
    parser: FieldParser,
}

impl FieldRule {
    /// Create a rule whose parser reads `groups` capture groups.
    pub fn new<F>(
        name: impl Into<String>,
        keywords: Vec<String>,
        pattern: Regex,
        groups: usize,
        parser: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&Captures<'_>) -> Result<FieldValue, ExtractionError> + Send + Sync + 'static,
    {
        let name = name.into();
        let actual = pattern.captures_len() - 1;
        if actual != groups {
            return Err(ConfigError::GroupMismatch {
                field: name,
                expected: groups,
                actual,
            });
        }

        Ok(Self {
            name,
            keywords,
            pattern,
            groups,
            all_matches: false,
            parser: Box::new(parser),
        })
    }

    /// Collect every match into a list instead of stopping at the first.
    pub fn with_all_matches(mut self, all: bool) -> Self {
        self.all_matches = all;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vocabulary the pattern was built from.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Number of capture groups the parser reads.
    pub fn groups(&self) -> usize {
        self.groups
    }

    pub fn collects_all(&self) -> bool {
        self.all_matches
    }

    /// Apply the rule to `text`.
    ///
    /// Without `all_matches` only the first match is parsed, and a parse
    /// failure there leaves the field empty. With it, each match is parsed
    /// independently and the values that parse are kept in text order.
    pub fn apply(&self, text: &str) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();

        if !self.all_matches {
            if let Some(caps) = self.pattern.captures(text) {
                match (self.parser)(&caps) {
                    Ok(value) => outcome.value = Some(value),
                    Err(e) => outcome.failures.push(e),
                }
            }
            return outcome;
        }

        let mut values = Vec::new();
        for caps in self.pattern.captures_iter(text) {
            match (self.parser)(&caps) {
                Ok(value) => values.push(value),
                Err(e) => outcome.failures.push(e),
            }
        }
        if !values.is_empty() {
            outcome.value = Some(FieldValue::List(values));
        }
        outcome
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("name", &self.name)
            .field("keywords", &self.keywords)
            .field("pattern", &self.pattern.as_str())
            .field("groups", &self.groups)
            .field("all_matches", &self.all_matches)
            .finish_non_exhaustive()
    }
}

/// Ordered, immutable collection of field rules.
///
/// Order only decides the attempt order; rules never affect each other.
#[derive(Debug)]
pub struct FieldRegistry {
    rules: Vec<FieldRule>,
}

impl FieldRegistry {
    /// Compile the standard rules from configuration.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let rules = RuleCompiler::new(config)?.compile_all()?;
        Self::from_rules(rules)
    }

    /// Build a registry from arbitrary rules; names must be unique.
    pub fn from_rules(rules: Vec<FieldRule>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name()) {
                return Err(ConfigError::DuplicateField(rule.name().to_string()));
            }
        }
        Ok(Self { rules })
    }

    /// All rules, in attempt order.
    pub fn all(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(FieldRule::name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a FieldRegistry {
    type Item = &'a FieldRule;
    type IntoIter = std::slice::Iter<'a, FieldRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
