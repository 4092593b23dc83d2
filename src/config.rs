//! # Router Configuration
//!
//! Configuration a host loads once at startup and hands to
//! [`Dispatcher::from_config`](crate::dispatcher::Dispatcher::from_config).
//!
//! ```yaml
//! base_path: /app
//! check_extraneous: true
//! contracts:
//!   person:
//!     name: s
//!     age?: iI+
//!     tags: ["s^"]
//! log:
//!   level: debug
//!   format: pretty
//! ```
//!
//! JSON works as well, since every JSON document is valid YAML.
//!
//! ## Environment Variables
//!
//! - `PACTR_BASE_PATH`: base path stripped from request URIs
//! - `PACTR_CHECK_EXTRANEOUS`: `true`/`false` (also `1`/`0`, `yes`/`no`)

use crate::logging::LogConfig;
use crate::payload::{Format, VerifyOptions};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Base path of the application; empty for none.
    pub base_path: String,
    /// Default for [`VerifyOptions::check_extraneous`].
    pub check_extraneous: bool,
    /// Named structural formats.
    pub contracts: BTreeMap<String, Format>,
    pub log: Option<LogConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            check_extraneous: true,
            contracts: BTreeMap::new(),
            log: None,
        }
    }
}

impl RouterConfig {
    /// Defaults overridden by `PACTR_BASE_PATH` and `PACTR_CHECK_EXTRANEOUS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from the environment, where set.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| env::var(key).ok());
    }

    /// [`apply_env`](Self::apply_env) against an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_path) = lookup("PACTR_BASE_PATH") {
            self.base_path = base_path;
        }
        if let Some(raw) = lookup("PACTR_CHECK_EXTRANEOUS") {
            match parse_bool(&raw) {
                Some(flag) => self.check_extraneous = flag,
                None => warn!(value = %raw, "Ignoring invalid PACTR_CHECK_EXTRANEOUS"),
            }
        }
    }

    /// Parse a YAML (or JSON) document.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(source).context("Failed to parse router configuration")?;
        debug!(
            base_path = %config.base_path,
            contracts = config.contracts.len(),
            "Router configuration parsed"
        );
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&source)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!(path = %path.display(), "Router configuration loaded");
        Ok(config)
    }

    /// The verifier defaults this configuration describes.
    #[must_use]
    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            check_extraneous: self.check_extraneous,
        }
    }

    /// A named contract.
    pub fn contract(&self, name: &str) -> Result<&Format> {
        self.contracts
            .get(name)
            .ok_or_else(|| anyhow!("unknown contract '{name}'"))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
