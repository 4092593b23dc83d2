//! Structural verification of payloads against a [`Format`] tree.
//!
//! Verification walks the payload and the format together, promoting scalars
//! in place. The first violation aborts the walk; nothing is accumulated.

use super::cache::RuleCache;
use super::format::{FormatError, Rule};
use super::registry::SchemaRegistry;
use super::schema::Format;
use http::StatusCode;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Per-call verification switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct VerifyOptions {
    /// Reject keyed payloads carrying keys the format does not declare.
    pub check_extraneous: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            check_extraneous: true,
        }
    }
}

impl VerifyOptions {
    /// Options that tolerate undeclared keys.
    #[must_use]
    pub fn allow_extraneous() -> Self {
        Self {
            check_extraneous: false,
        }
    }
}

/// Why a value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationReason {
    TypeMismatch,
    CheckFailed(char),
    NotScalar,
    NotSequence,
    NotKeyed,
    MissingField(String),
    UnexpectedField(String),
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationReason::TypeMismatch => f.write_str("value does not match any accepted type"),
            ViolationReason::CheckFailed(c) => write!(f, "check '{c}' failed"),
            ViolationReason::NotScalar => f.write_str("expected a scalar value"),
            ViolationReason::NotSequence => f.write_str("expected an indexed collection"),
            ViolationReason::NotKeyed => f.write_str("expected a keyed collection"),
            ViolationReason::MissingField(name) => write!(f, "required field '{name}' is missing"),
            ViolationReason::UnexpectedField(name) => write!(f, "unexpected field '{name}'"),
        }
    }
}

/// A payload value that did not satisfy its format.
///
/// Carries the offending value and the rejecting format for diagnostics.
/// Always presented to clients as 400 Bad Request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("payload {value} at {path} did not match the format {format}: {reason}")]
pub struct ContractViolation {
    path: String,
    value: Value,
    format: Format,
    reason: ViolationReason,
}

impl ContractViolation {
    /// Location of the value inside the payload, e.g. `$.items[2].price`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn format(&self) -> &Format {
        &self.format
    }

    #[must_use]
    pub fn reason(&self) -> &ViolationReason {
        &self.reason
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// Verification failure: either the format itself is broken or the payload
/// violates it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Violation(#[from] ContractViolation),
}

impl VerifyError {
    #[must_use]
    pub fn violation(&self) -> Option<&ContractViolation> {
        match self {
            VerifyError::Violation(v) => Some(v),
            VerifyError::Format(_) => None,
        }
    }
}

const ROOT_PATH: &str = "$";

/// Verifies payloads against structural formats using one frozen registry.
#[derive(Debug)]
pub struct PayloadVerifier {
    registry: Arc<SchemaRegistry>,
    cache: RuleCache,
    defaults: VerifyOptions,
}

impl Default for PayloadVerifier {
    fn default() -> Self {
        Self::new(SchemaRegistry::new())
    }
}

impl PayloadVerifier {
    /// Freeze `registry` and build a verifier over it.
    #[must_use]
    pub fn new(registry: SchemaRegistry) -> Self {
        Self::with_shared_registry(Arc::new(registry))
    }

    #[must_use]
    pub fn with_shared_registry(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            cache: RuleCache::new(),
            defaults: VerifyOptions::default(),
        }
    }

    /// Options used by [`verify`](Self::verify).
    #[must_use]
    pub fn with_defaults(mut self, defaults: VerifyOptions) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub fn defaults(&self) -> VerifyOptions {
        self.defaults
    }

    #[must_use]
    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    /// Compiled rule for a scalar format.
    pub fn rule(&self, format: &str) -> Result<Arc<Rule>, FormatError> {
        self.cache.get_or_parse(format, &self.registry)
    }

    /// Verify with the verifier's default options.
    pub fn verify(&self, value: &mut Value, format: &Format) -> Result<(), VerifyError> {
        self.verify_with(value, format, self.defaults)
    }

    /// Verify `value` against `format`, promoting scalars in place.
    pub fn verify_with(
        &self,
        value: &mut Value,
        format: &Format,
        options: VerifyOptions,
    ) -> Result<(), VerifyError> {
        let result = self.walk(value, format, ROOT_PATH, options);
        if let Err(VerifyError::Violation(v)) = &result {
            debug!(path = %v.path(), reason = %v.reason(), "Payload contract violation");
        }
        result
    }

    fn walk(
        &self,
        value: &mut Value,
        format: &Format,
        path: &str,
        options: VerifyOptions,
    ) -> Result<(), VerifyError> {
        match format {
            Format::Scalar(source) => self.walk_scalar(value, source, format, path),
            Format::Sequence(element) => {
                if matches!(value, Value::Object(map) if map.is_empty()) {
                    *value = Value::Array(Vec::new());
                }
                let Value::Array(items) = value else {
                    return Err(violation(path, value, format, ViolationReason::NotSequence));
                };
                for (index, item) in items.iter_mut().enumerate() {
                    self.walk(item, element, &format!("{path}[{index}]"), options)?;
                }
                Ok(())
            }
            Format::Keyed(fields) => {
                if matches!(value, Value::Array(items) if items.is_empty()) {
                    *value = Value::Object(Map::new());
                }
                let Value::Object(map) = value else {
                    return Err(violation(path, value, format, ViolationReason::NotKeyed));
                };
                let mut expected = fields.len();
                for (key, sub) in fields {
                    let present = match map.get(&key.name) {
                        None => false,
                        Some(Value::Null) => !key.optional,
                        Some(_) => true,
                    };
                    if present {
                        if let Some(field) = map.get_mut(&key.name) {
                            self.walk(field, sub, &format!("{path}.{}", key.name), options)?;
                        }
                    } else if !key.optional {
                        let reason = ViolationReason::MissingField(key.name.clone());
                        return Err(violation(path, &Value::Object(map.clone()), format, reason));
                    } else {
                        // An optional key given as null is treated as omitted.
                        map.shift_remove(&key.name);
                        expected -= 1;
                    }
                }
                if options.check_extraneous && expected != map.len() {
                    let extra = map
                        .keys()
                        .find(|k| !fields.iter().any(|(key, _)| key.name == **k))
                        .cloned()
                        .unwrap_or_default();
                    let reason = ViolationReason::UnexpectedField(extra);
                    return Err(violation(path, &Value::Object(map.clone()), format, reason));
                }
                Ok(())
            }
        }
    }

    fn walk_scalar(
        &self,
        value: &mut Value,
        source: &str,
        format: &Format,
        path: &str,
    ) -> Result<(), VerifyError> {
        if value.is_array() || value.is_object() {
            return Err(violation(path, value, format, ViolationReason::NotScalar));
        }
        let rule = self.rule(source)?;
        if !rule.accepts_type(value) {
            return Err(violation(path, value, format, ViolationReason::TypeMismatch));
        }
        rule.promote(value);
        if let Some(check) = rule.first_failed_check(value) {
            return Err(violation(
                path,
                value,
                format,
                ViolationReason::CheckFailed(check),
            ));
        }
        Ok(())
    }
}

fn violation(path: &str, value: &Value, format: &Format, reason: ViolationReason) -> VerifyError {
    VerifyError::Violation(ContractViolation {
        path: path.to_string(),
        value: value.clone(),
        format: format.clone(),
        reason,
    })
}
