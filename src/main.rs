//! embedscan CLI entry point

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use embedscan::commands::{run_analyze, run_discover, CommandContext};
use embedscan::{Cli, Commands, ScanError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<ScanError>()
                .map(ScanError::exit_code)
                .unwrap_or(ExitCode::FAILURE)
        }
    }
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "embedscan=debug" } else { "embedscan=info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let ctx = CommandContext::from_cli(cli.format, cli.verbose);
    let output = match &cli.command {
        Commands::Analyze(args) => run_analyze(args, &ctx).context("analyze failed")?,
        Commands::Discover(args) => run_discover(args, &ctx).context("discover failed")?,
    };
    Ok(output)
}
