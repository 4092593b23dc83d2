use clap::Parser;
use pactrouter::cli::{run_cli, Cli};
use pactrouter::logging::init_logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_config()) {
        eprintln!("Warning: {e:#}");
    }

    let mut stdout = std::io::stdout().lock();
    match run_cli(&cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
