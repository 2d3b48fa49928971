// beatsync-cli/src/config.rs
//
// Builds the core config for `generate`: JSON file (if any), then BEATSYNC_*
// environment variables, then command-line flags.

use crate::cli::GenerateArgs;
use crate::error::CliResult;
use anyhow::Context;
use beatsync_core::{SyncConfig, SyncConfigBuilder};

pub fn build_config(args: &GenerateArgs) -> CliResult<SyncConfig> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => SyncConfig::default(),
    };
    config.apply_env_overrides();

    let mut builder = SyncConfigBuilder::from_config(config);
    if let Some(fps) = args.fps {
        builder = builder.fps(fps);
    }
    if let Some(dir) = &args.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }
    let config = builder.build();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::path::PathBuf;

    fn generate_args(extra: &[&str]) -> GenerateArgs {
        let mut argv = vec!["beatsync", "generate", "-m", "s.mp3", "--video", "a.mp4", "-o", "o.mp4"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Generate(args) => args,
            Commands::Analyze(_) => unreachable!(),
        }
    }

    #[test]
    fn flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beatsync.json");
        std::fs::write(&path, r#"{"fps": 30, "preset": "fast"}"#).unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let args = generate_args(&["--config", &path_arg, "--fps", "50", "--temp-dir", "/scratch"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.fps, 50);
        assert_eq!(config.preset, "fast");
        assert_eq!(config.temp_dir, Some(PathBuf::from("/scratch")));
    }

    #[test]
    fn unreadable_config_file_is_an_error() {
        let args = generate_args(&["--config", "/nonexistent/beatsync.json"]);
        let err = build_config(&args).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load config file"));
    }
}
