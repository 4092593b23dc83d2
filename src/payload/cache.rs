//! Compiled-rule cache.
//!
//! Parsing a scalar format is cheap but not free, and the same handful of
//! format strings is verified on every request. A [`RuleCache`] memoizes
//! [`parse`] per format string. It belongs to one verifier: the verifier's
//! registry is frozen behind an `Arc`, so a cached rule never goes stale.

use super::format::{parse, FormatError, Rule};
use super::registry::SchemaRegistry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Thread-safe map of format string → compiled [`Rule`].
#[derive(Debug, Default)]
pub struct RuleCache {
    rules: RwLock<HashMap<String, Arc<Rule>>>,
}

impl RuleCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached rule for `format`, compiling and storing it on a miss.
    ///
    /// Parse failures are not cached; the caller sees the error every time.
    pub fn get_or_parse(
        &self,
        format: &str,
        registry: &SchemaRegistry,
    ) -> Result<Arc<Rule>, FormatError> {
        {
            let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
            if let Some(rule) = rules.get(format) {
                debug!(format = %format, "Rule cache hit");
                return Ok(Arc::clone(rule));
            }
        }

        let rule = Arc::new(parse(format, registry)?);
        let mut rules = self.rules.write().unwrap_or_else(|e| e.into_inner());
        // Another thread may have compiled the same format meanwhile.
        let cached = rules
            .entry(format.to_string())
            .or_insert_with(|| Arc::clone(&rule));
        debug!(format = %format, rule = %cached, "Compiled scalar format");
        Ok(Arc::clone(cached))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut rules = self.rules.write().unwrap_or_else(|e| e.into_inner());
        let count = rules.len();
        rules.clear();
        info!(count = count, "Cleared rule cache");
    }
}
