//! Dirseal CLI binary.

use anyhow::Context;
use clap::{CommandFactory, Parser};
use dirseal::cli::{execute, Cli, Commands};
use dirseal::logging::init_logging;
use std::process;
use tracing::error;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_level.as_deref()) {
        eprintln!("dirseal: failed to initialize logging: {}", e);
        process::exit(2);
    }

    let Some(command) = &cli.command else {
        // No subcommand: print usage and exit successfully.
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
        return;
    };

    match run(&cli, command) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("dirseal: {:#}", e);
            process::exit(2);
        }
    }
}

fn run(cli: &Cli, command: &Commands) -> anyhow::Result<i32> {
    let config = cli.run_config().context("invalid configuration")?;
    let code = execute(command, &config)?;
    Ok(code)
}
