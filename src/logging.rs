//! Structured logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the host. [`init_logging`] installs the stock one: an [`EnvFilter`] plus a
//! JSON (production) or pretty (development) fmt layer writing to stderr.
//!
//! ## Environment Variables
//!
//! - `PACTR_LOG_LEVEL`: `trace`, `debug`, `info` (default), `warn`, `error`
//! - `PACTR_LOG_FORMAT`: `json` (default) or `pretty`
//! - `PACTR_LOG_TARGETS`: extra comma-separated filter directives, e.g.
//!   `pactrouter::router=debug`
//!
//! `RUST_LOG`, when set, takes precedence over `PACTR_LOG_LEVEL`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// Lenient parse; anything but `pretty` means JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub level: String,
    pub format: LogFormat,
    /// Extra filter directives (comma-separated)
    pub targets: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            targets: None,
        }
    }
}

impl LogConfig {
    /// Read `PACTR_LOG_*`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) against an arbitrary variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            level: lookup("PACTR_LOG_LEVEL").unwrap_or(defaults.level),
            format: lookup("PACTR_LOG_FORMAT").map_or(defaults.format, |f| LogFormat::parse(&f)),
            targets: lookup("PACTR_LOG_TARGETS").filter(|t| !t.trim().is_empty()),
        }
    }

    fn level(&self) -> Level {
        match self.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// The filter this configuration describes. Invalid target directives
    /// are skipped with a warning on stderr.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(targets) = &self.targets {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails, without panicking, if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        targets = ?config.targets,
        "Logging initialized"
    );
    Ok(())
}
