// ============================================================================
// beatsync-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: env_logger Initialization and Timestamps
//
// The core logs through the `log` facade; this module installs env_logger
// as the backend for the binary.
//
// USAGE:
// - default: info
// - --verbose: debug
// - RUST_LOG=...: overrides both (e.g. RUST_LOG=ffmpeg_log=debug)

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Installs env_logger. Safe to call once per process.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format_target(verbose).format_timestamp_secs();
    if !verbose && std::env::var_os("RUST_LOG").is_none() {
        // ffmpeg's own chatter only with --verbose or RUST_LOG
        builder.filter_module("ffmpeg_log", LevelFilter::Warn);
    }
    if let Err(e) = builder.try_init() {
        eprintln!("Logger already initialized: {e}");
    }
}

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
