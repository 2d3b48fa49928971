//! Implementation of the 'analyze' subcommand.

use crate::cli::AnalyzeArgs;
use crate::error::CliResult;
use crate::terminal;

use anyhow::Context;
use beatsync_core::external::{CrateFfprobeExecutor, SidecarSpawner};
use beatsync_core::processing::BeatSyncGenerator;
use beatsync_core::{MusicAnalysis, SyncConfig, format_duration};

/// Hooks listed in the human-readable output.
const HOOKS_SHOWN: usize = 10;

fn display_analysis(analysis: &MusicAnalysis) {
    terminal::print_section("MUSIC ANALYSIS");
    terminal::print_status("Duration", &format_duration(analysis.duration), false);
    terminal::print_status("Tempo", &format!("{:.1} BPM", analysis.tempo_bpm), true);
    terminal::print_status("Beats", &analysis.beat_times.len().to_string(), false);
    terminal::print_status("Hooks", &analysis.hooks.len().to_string(), false);

    if analysis.hooks.is_empty() {
        return;
    }
    terminal::print_section("STRONGEST HOOKS");
    for (rank, hook) in analysis.hooks.iter().take(HOOKS_SHOWN).enumerate() {
        terminal::print_status(
            &format!("#{}", rank + 1),
            &format!("{:>8.3}s  strength {:.2}", hook.time, hook.strength),
            false,
        );
    }
}

pub fn run_analyze(args: AnalyzeArgs) -> CliResult<()> {
    let generator = BeatSyncGenerator::new(SidecarSpawner, CrateFfprobeExecutor::new(), SyncConfig::from_env());
    let analysis = generator
        .analyze(&args.music, args.hook_sensitivity)
        .context("Analysis failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        display_analysis(&analysis);
    }
    Ok(())
}
