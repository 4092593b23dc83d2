//! Scalar format parser.
//!
//! A scalar format reads `<types:1+><promotion:0-1><checks:0+><nullable:0-1>`,
//! e.g. `"siI+"`: string or integer, promoted to integer, must be positive.
//! Every character is resolved against a [`SchemaRegistry`] at parse time and
//! the result is a self-contained [`Rule`].

use super::registry::{CheckFn, PromoteFn, SchemaRegistry, TypeFn, NULLABLE_MARKER};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Malformed scalar or structural format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("invalid scalar format: format is empty")]
    Empty,
    #[error("invalid scalar format '{0}': expected at least one type specifier")]
    MissingType(String),
    #[error("invalid scalar format '{format}': only one promotion is allowed, found '{found}'")]
    MultiplePromotions { format: String, found: char },
    #[error("invalid scalar format '{format}': unknown specifier '{found}' at position {position}")]
    UnknownSpecifier {
        format: String,
        found: char,
        position: usize,
    },
    #[error("invalid payload key '{0}' in format")]
    InvalidKey(String),
    #[error("invalid sequence format: expected exactly one element format, found {0}")]
    InvalidSequence(usize),
    #[error("invalid format value: {0}")]
    InvalidValue(String),
}

/// Compiled scalar format.
#[derive(Clone)]
pub struct Rule {
    source: String,
    types: Vec<(char, TypeFn)>,
    promotion: Option<(char, PromoteFn)>,
    checks: Vec<(char, CheckFn)>,
    allow_null: bool,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("source", &self.source)
            .field("types", &self.type_chars())
            .field("promotion", &self.promotion_char())
            .field("checks", &self.check_chars())
            .field("allow_null", &self.allow_null)
            .finish()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "types=[{}]", self.type_chars())?;
        match self.promotion_char() {
            Some(p) => write!(f, " promotion={p}")?,
            None => write!(f, " promotion=-")?,
        }
        write!(f, " checks=[{}] nullable={}", self.check_chars(), self.allow_null)
    }
}

impl Rule {
    /// The format string this rule was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn type_chars(&self) -> String {
        self.types.iter().map(|(c, _)| *c).collect()
    }

    #[must_use]
    pub fn promotion_char(&self) -> Option<char> {
        self.promotion.as_ref().map(|(c, _)| *c)
    }

    #[must_use]
    pub fn check_chars(&self) -> String {
        self.checks.iter().map(|(c, _)| *c).collect()
    }

    #[must_use]
    pub fn allows_null(&self) -> bool {
        self.allow_null
    }

    /// OR over the type predicates, with null admitted when nullable.
    #[must_use]
    pub fn accepts_type(&self, value: &Value) -> bool {
        self.types.iter().any(|(_, type_fn)| type_fn(value)) || (value.is_null() && self.allow_null)
    }

    /// Apply the promotion, if any, in place.
    pub fn promote(&self, value: &mut Value) {
        if let Some((_, promote_fn)) = &self.promotion {
            *value = promote_fn(value);
        }
    }

    /// The first check (in declared order) the value fails.
    #[must_use]
    pub fn first_failed_check(&self, value: &Value) -> Option<char> {
        self.checks
            .iter()
            .find(|(_, check_fn)| !check_fn(value))
            .map(|(c, _)| *c)
    }
}

/// Compile `format` against the current contents of `registry`.
pub fn parse(format: &str, registry: &SchemaRegistry) -> Result<Rule, FormatError> {
    if format.is_empty() {
        return Err(FormatError::Empty);
    }

    let mut chars = format.char_indices().peekable();
    let mut types: Vec<(char, TypeFn)> = Vec::new();
    while let Some(&(_, c)) = chars.peek() {
        let Some(type_fn) = registry.type_fn(c) else {
            break;
        };
        if !types.iter().any(|(seen, _)| *seen == c) {
            types.push((c, Arc::clone(type_fn)));
        }
        chars.next();
    }
    if types.is_empty() {
        return Err(FormatError::MissingType(format.to_string()));
    }

    let mut promotion: Option<(char, PromoteFn)> = None;
    while let Some(&(_, c)) = chars.peek() {
        let Some(promote_fn) = registry.promotion(c) else {
            break;
        };
        if promotion.is_some() {
            return Err(FormatError::MultiplePromotions {
                format: format.to_string(),
                found: c,
            });
        }
        promotion = Some((c, Arc::clone(promote_fn)));
        chars.next();
    }

    let mut checks: Vec<(char, CheckFn)> = Vec::new();
    while let Some(&(_, c)) = chars.peek() {
        let Some(check_fn) = registry.check(c) else {
            break;
        };
        if !checks.iter().any(|(seen, _)| *seen == c) {
            checks.push((c, Arc::clone(check_fn)));
        }
        chars.next();
    }

    let allow_null = chars.next_if(|&(_, c)| c == NULLABLE_MARKER).is_some();

    if let Some((position, found)) = chars.next() {
        return Err(FormatError::UnknownSpecifier {
            format: format.to_string(),
            found,
            position,
        });
    }

    Ok(Rule {
        source: format.to_string(),
        types,
        promotion,
        checks,
        allow_null,
    })
}
