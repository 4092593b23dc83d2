//! Structural formats: the schema tree a payload is verified against.
//!
//! ```text
//! "siI"                          scalar
//! ["i+"]                         every element is a positive integer
//! {"name": "s", "age?": "i"}     exact object shape, `age` optional
//! ```
//!
//! Formats are usually written as JSON/YAML and decoded with serde, but can be
//! built in code as well.

use super::format::FormatError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

#[allow(clippy::expect_used)]
static KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(\?)?$").expect("payload key pattern is valid")
});

/// A declared field of a keyed format: the real key plus its optionality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    pub name: String,
    pub optional: bool,
}

impl FieldKey {
    /// Parse `name` or `name?`.
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let caps = KEY_RE
            .captures(raw)
            .ok_or_else(|| FormatError::InvalidKey(raw.to_string()))?;
        Ok(Self {
            name: caps[1].to_string(),
            optional: caps.get(2).is_some(),
        })
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "{}?", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Structural format tree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Format {
    /// Scalar format string, compiled lazily by the verifier.
    Scalar(String),
    /// Homogeneous indexed collection.
    Sequence(Box<Format>),
    /// Exact keyed shape, in declared order.
    Keyed(Vec<(FieldKey, Format)>),
}

impl Format {
    pub fn scalar(format: impl Into<String>) -> Self {
        Format::Scalar(format.into())
    }

    #[must_use]
    pub fn sequence(element: Format) -> Self {
        Format::Sequence(Box::new(element))
    }

    /// Keyed format from `(key, format)` pairs; keys may carry a trailing `?`.
    pub fn keyed<I, K, F>(fields: I) -> Result<Self, FormatError>
    where
        I: IntoIterator<Item = (K, F)>,
        K: AsRef<str>,
        F: Into<Format>,
    {
        fields
            .into_iter()
            .map(|(key, format)| Ok((FieldKey::parse(key.as_ref())?, format.into())))
            .collect::<Result<Vec<_>, FormatError>>()
            .map(Format::Keyed)
    }

    /// Decode a format from its JSON representation.
    pub fn from_value(value: &Value) -> Result<Self, FormatError> {
        match value {
            Value::String(s) => Ok(Format::Scalar(s.clone())),
            Value::Array(items) => match items.as_slice() {
                [element] => Ok(Format::sequence(Format::from_value(element)?)),
                other => Err(FormatError::InvalidSequence(other.len())),
            },
            Value::Object(map) => map
                .iter()
                .map(|(key, sub)| Ok((FieldKey::parse(key)?, Format::from_value(sub)?)))
                .collect::<Result<Vec<_>, FormatError>>()
                .map(Format::Keyed),
            other => Err(FormatError::InvalidValue(other.to_string())),
        }
    }

    /// Encode back to the JSON representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Format::Scalar(s) => Value::String(s.clone()),
            Format::Sequence(element) => Value::Array(vec![element.to_value()]),
            Format::Keyed(fields) => {
                let mut map = Map::new();
                for (key, format) in fields {
                    map.insert(key.to_string(), format.to_value());
                }
                Value::Object(map)
            }
        }
    }
}

impl From<&str> for Format {
    fn from(s: &str) -> Self {
        Format::Scalar(s.to_string())
    }
}

impl From<String> for Format {
    fn from(s: String) -> Self {
        Format::Scalar(s)
    }
}

impl TryFrom<Value> for Format {
    type Error = FormatError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Format::from_value(&value)
    }
}

impl From<Format> for Value {
    fn from(format: Format) -> Self {
        format.to_value()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Scalar(s) => write!(f, "'{s}'"),
            other => write!(f, "{}", other.to_value()),
        }
    }
}
