// beatsync-cli/src/lib.rs
//
// Library portion of the BeatSync CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{AnalyzeArgs, Cli, Commands, GenerateArgs};
pub use commands::analyze::run_analyze;
pub use commands::generate::run_generate;
