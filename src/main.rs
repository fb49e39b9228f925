mod cli;
mod commands;
mod output;
mod telemetry;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_tracing(cli.verbose) {
        eprintln!("warn: {}", e);
    }

    if let Err(e) = commands::run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
