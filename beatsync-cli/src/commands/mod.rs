//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Module containing the implementation of the `analyze` command.
/// This command prints the tempo, beats and hooks found in a music file.
pub mod analyze;

/// Module containing the implementation of the `generate` command.
/// This command runs the whole pipeline and writes the output video.
pub mod generate;
