// beatsync-cli/src/main.rs
//
// Entry point of the `beatsync` binary: parses arguments, sets up logging,
// dispatches the subcommand and turns failures into exit code 1.

use beatsync_cli::error::{FAILURE_EXIT_CODE, suggestion};
use beatsync_cli::logging::init_logging;
use beatsync_cli::{Cli, Commands, run_analyze, run_generate, terminal};
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Analyze(args) => run_analyze(args),
    };

    if let Err(e) = result {
        log::debug!("Error chain: {e:?}");
        terminal::print_error("Error", &format!("{e:#}"), suggestion(&e));
        process::exit(FAILURE_EXIT_CODE);
    }
}
