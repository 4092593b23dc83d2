//! # CLI Module
//!
//! Command-line access to the payload contract engine, for checking
//! contracts and sample payloads outside a running service.
//!
//! ## Commands
//!
//! ### `verify`
//!
//! Verify a JSON payload against a structural format and print the promoted
//! payload:
//!
//! ```bash
//! pactrouter verify --contract person.yaml --payload person.json
//! echo '{"name": "Roger"}' | pactrouter verify --contract config.yaml --name person --payload -
//! ```
//!
//! Options:
//! - `--contract <FILE>` - Format file (YAML or JSON), or a router config with `--name`
//! - `--name <NAME>` - Named contract inside the config file
//! - `--payload <FILE|->` - JSON payload, `-` for stdin
//! - `--allow-extraneous` - Tolerate undeclared keys
//!
//! ### `format`
//!
//! Compile scalar formats and print their rules:
//!
//! ```bash
//! pactrouter format 'siI+' 's^!?'
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use pactrouter::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! run_cli(&cli, &mut std::io::stdout())?;
//! ```

mod commands;

pub use commands::{run_cli, Cli, Commands};
