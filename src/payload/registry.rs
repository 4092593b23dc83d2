//! Schema registry: the character vocabulary of scalar formats.
//!
//! A registry maps single characters to one of three behaviours:
//!
//! | kind      | keys                      | signature          |
//! |-----------|---------------------------|--------------------|
//! | type      | lowercase letters         | `&Value -> bool`   |
//! | promotion | uppercase letters, symbols| `&Value -> Value`  |
//! | check     | non-letters               | `&Value -> bool`   |
//!
//! The registry is plain configuration: build it (and extend it) at startup,
//! then hand it to a [`PayloadVerifier`](super::PayloadVerifier), which
//! freezes it behind an `Arc`. Registrations are last-write-wins.

use super::coerce;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Type predicate: does the value have this type?
pub type TypeFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
/// Promotion: convert an accepted value.
pub type PromoteFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;
/// Post-promotion check predicate.
pub type CheckFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Trailing format character marking a nullable scalar.
pub const NULLABLE_MARKER: char = '?';

/// Rejected registry registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("cannot register type: specifier character '{0}' is invalid")]
    InvalidTypeChar(char),
    #[error("cannot register promotion: character '{0}' is already used for a check")]
    PromotionCollidesWithCheck(char),
    #[error("cannot register promotion: specifier character '{0}' is invalid")]
    InvalidPromotionChar(char),
    #[error("cannot register check: specifier character '{0}' is invalid")]
    InvalidCheckChar(char),
    #[error("cannot register check: character '{0}' is already used for a promotion")]
    CheckCollidesWithPromotion(char),
    #[error("character '{NULLABLE_MARKER}' is reserved for nullability")]
    Reserved,
}

/// Character → behaviour tables consulted by the format parser.
#[derive(Clone)]
pub struct SchemaRegistry {
    types: BTreeMap<char, TypeFn>,
    promotions: BTreeMap<char, PromoteFn>,
    checks: BTreeMap<char, CheckFn>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("types", &self.types.keys().collect::<String>())
            .field("promotions", &self.promotions.keys().collect::<String>())
            .field("checks", &self.checks.keys().collect::<String>())
            .finish()
    }
}

impl SchemaRegistry {
    /// Registry pre-populated with the base vocabulary.
    ///
    /// - types: `b` bool, `s` string, `i` integer, `f` float, `d` double
    /// - promotions: `B` bool, `S` string, `I` integer, `F`/`D` float, `^` trim
    /// - checks: `!` non-empty, `+` positive, `-` negative, `*` non-negative,
    ///   `%` non-zero
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.types.insert('b', Arc::new(coerce::is_bool));
        registry.types.insert('s', Arc::new(coerce::is_string));
        registry.types.insert('i', Arc::new(coerce::is_integer));
        registry.types.insert('f', Arc::new(coerce::is_float));
        registry.types.insert('d', Arc::new(coerce::is_float));

        registry
            .promotions
            .insert('B', Arc::new(|v: &Value| Value::Bool(coerce::truthy(v))));
        registry
            .promotions
            .insert('S', Arc::new(|v: &Value| Value::String(coerce::stringify(v))));
        registry
            .promotions
            .insert('I', Arc::new(|v: &Value| Value::from(coerce::to_integer(v))));
        registry
            .promotions
            .insert('F', Arc::new(|v: &Value| coerce::float_value(coerce::to_float(v))));
        registry
            .promotions
            .insert('D', Arc::new(|v: &Value| coerce::float_value(coerce::to_float(v))));
        registry.promotions.insert(
            '^',
            Arc::new(|v: &Value| Value::String(coerce::stringify(v).trim().to_string())),
        );

        registry
            .checks
            .insert('!', Arc::new(|v: &Value| !coerce::stringify(v).is_empty()));
        registry.checks.insert(
            '+',
            Arc::new(|v: &Value| coerce::numeric(v).is_some_and(|n| n > 0.0)),
        );
        registry.checks.insert(
            '-',
            Arc::new(|v: &Value| coerce::numeric(v).is_some_and(|n| n < 0.0)),
        );
        registry.checks.insert(
            '*',
            Arc::new(|v: &Value| coerce::numeric(v).is_some_and(|n| n >= 0.0)),
        );
        registry.checks.insert(
            '%',
            Arc::new(|v: &Value| coerce::numeric(v).is_some_and(|n| n != 0.0)),
        );
        registry
    }

    /// Registry with no vocabulary at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
            promotions: BTreeMap::new(),
            checks: BTreeMap::new(),
        }
    }

    /// Register (or override) a type. The character is lowercased and must be
    /// an ASCII letter.
    pub fn register_type<F>(&mut self, chr: char, type_fn: F) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let chr = chr.to_ascii_lowercase();
        if !chr.is_ascii_lowercase() {
            return Err(RegistryError::InvalidTypeChar(chr));
        }
        self.types.insert(chr, Arc::new(type_fn));
        Ok(self)
    }

    /// Register (or override) a promotion. Letters are uppercased; the
    /// character may not already name a check.
    pub fn register_promotion<F>(
        &mut self,
        chr: char,
        promote_fn: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let chr = chr.to_ascii_uppercase();
        if chr == NULLABLE_MARKER {
            return Err(RegistryError::Reserved);
        }
        if chr.is_whitespace() || chr.is_lowercase() {
            return Err(RegistryError::InvalidPromotionChar(chr));
        }
        if self.checks.contains_key(&chr) {
            return Err(RegistryError::PromotionCollidesWithCheck(chr));
        }
        self.promotions.insert(chr, Arc::new(promote_fn));
        Ok(self)
    }

    /// Register (or override) a check. Letters are rejected, as is any
    /// character already naming a promotion.
    pub fn register_check<F>(&mut self, chr: char, check_fn: F) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        if chr == NULLABLE_MARKER {
            return Err(RegistryError::Reserved);
        }
        if chr.is_alphabetic() || chr.is_whitespace() {
            return Err(RegistryError::InvalidCheckChar(chr));
        }
        if self.promotions.contains_key(&chr) {
            return Err(RegistryError::CheckCollidesWithPromotion(chr));
        }
        self.checks.insert(chr, Arc::new(check_fn));
        Ok(self)
    }

    #[must_use]
    pub fn type_fn(&self, chr: char) -> Option<&TypeFn> {
        self.types.get(&chr)
    }

    #[must_use]
    pub fn promotion(&self, chr: char) -> Option<&PromoteFn> {
        self.promotions.get(&chr)
    }

    #[must_use]
    pub fn check(&self, chr: char) -> Option<&CheckFn> {
        self.checks.get(&chr)
    }

    /// Every registered character, grouped as `(types, promotions, checks)`.
    #[must_use]
    pub fn vocabulary(&self) -> (String, String, String) {
        (
            self.types.keys().collect(),
            self.promotions.keys().collect(),
            self.checks.keys().collect(),
        )
    }
}
