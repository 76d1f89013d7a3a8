use std::process::ExitCode;

use clap::Parser;
use cli::Cli;

mod cli;
mod commands;
mod scenario;

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.start()
}
