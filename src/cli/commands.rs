use crate::config::RouterConfig;
use crate::logging::{LogConfig, LogFormat};
use crate::payload::{parse, Format, PayloadVerifier, SchemaRegistry, VerifyOptions};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Command-line interface for pactrouter
#[derive(Parser, Debug)]
#[command(name = "pactrouter")]
#[command(about = "Payload contract tooling", long_about = None, version)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, env = "PACTR_LOG_FORMAT", value_parser = ["json", "pretty"])]
    pub log_format: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "PACTR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify a JSON payload against a contract and print it promoted
    Verify {
        /// Format file (YAML or JSON), or a router config when `--name` is given
        #[arg(short, long)]
        contract: PathBuf,

        /// Named contract inside the config file
        #[arg(short, long)]
        name: Option<String>,

        /// JSON payload file, `-` for stdin
        #[arg(short, long)]
        payload: String,

        /// Tolerate keys the contract does not declare
        #[arg(long, default_value_t = false)]
        allow_extraneous: bool,
    },
    /// Compile scalar formats and print their rules
    Format {
        /// Scalar format strings, e.g. `siI+`
        #[arg(required = true, num_args = 1..)]
        formats: Vec<String>,
    },
}

impl Cli {
    /// Logging configuration: environment first, then the global flags.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();
        if let Some(format) = &self.log_format {
            config.format = LogFormat::parse(format);
        }
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        config
    }
}

/// Execute the command, writing results to `out`.
///
/// # Errors
///
/// Returns an error if an input cannot be read or parsed, if a format does
/// not compile, or if the payload violates the contract.
pub fn run_cli(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Commands::Verify {
            contract,
            name,
            payload,
            allow_extraneous,
        } => {
            let (format, mut options) = load_contract(contract, name.as_deref())?;
            if *allow_extraneous {
                options = VerifyOptions::allow_extraneous();
            }
            let mut value = read_payload(payload)?;
            debug!(contract = %contract.display(), format = %format, "Verifying payload");

            PayloadVerifier::default().verify_with(&mut value, &format, options)?;
            info!(contract = %contract.display(), "Payload satisfies contract");
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            Ok(())
        }
        Commands::Format { formats } => {
            let registry = SchemaRegistry::new();
            for format in formats {
                let rule = parse(format, &registry)?;
                writeln!(out, "{format}: {rule}")?;
            }
            Ok(())
        }
    }
}

fn load_contract(path: &Path, name: Option<&str>) -> Result<(Format, VerifyOptions)> {
    match name {
        Some(name) => {
            let config = RouterConfig::load(path)?;
            let format = config.contract(name)?.clone();
            Ok((format, config.verify_options()))
        }
        None => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read contract {}", path.display()))?;
            let format: Format = serde_yaml::from_str(&source)
                .with_context(|| format!("Invalid contract {}", path.display()))?;
            Ok((format, VerifyOptions::default()))
        }
    }
}

fn read_payload(source: &str) -> Result<Value> {
    let text = if source == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read payload from stdin")?;
        text
    } else {
        fs::read_to_string(source).with_context(|| format!("Failed to read payload {source}"))?
    };
    serde_json::from_str(&text).context("Payload is not valid JSON")
}
