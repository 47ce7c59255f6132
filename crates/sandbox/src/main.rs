//! Sandbox runner for the cause tracker.
//!
//! Replays a RON scenario against an in-memory world and prints the final
//! world state. Run with: `cargo run -p tracking-sandbox -- --scenario <file>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracking_content::{ConfigLoader, ScenarioLoader};
use tracking_core::TrackerConfig;
use tracking_sandbox::{DEMO_SCENARIO, SandboxConfig, ScenarioRunner, logging};

/// Replay cause-tracking scenarios against an in-memory world
#[derive(Parser)]
#[command(name = "tracking-sandbox")]
#[command(about = "Replays cause-tracking scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// Scenario file (RON). Runs the built-in demo when omitted.
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Tracker configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to a file in the platform cache directory
    #[arg(long)]
    log_file: bool,
}

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let tracker = match &cli.config {
        Some(path) => ConfigLoader::load(path)?,
        None => TrackerConfig::default(),
    };
    let mut config = SandboxConfig::new(tracker).with_env_overrides();
    config.log_to_file |= cli.log_file;

    let _guard = logging::setup_logging(&config)?;

    let spec = match &cli.scenario {
        Some(path) => ScenarioLoader::load(path)?,
        None => ScenarioLoader::parse(DEMO_SCENARIO).context("Failed to parse demo scenario")?,
    };

    let mut runner = ScenarioRunner::new(&spec, config.tracker);
    let report = runner
        .run()
        .with_context(|| format!("Scenario '{}' failed", spec.name))?;

    println!("scenario: {}", report.name);
    println!("steps:    {}", report.steps);
    println!("entities: {}", report.entities);
    println!("audited:  {}", report.audited);
    if report.open_phases > 0 {
        println!("open phases: {}", report.open_phases);
    }
    println!("blocks:");
    for (pos, state) in &report.blocks {
        println!("  {pos} = {state}");
    }
    Ok(())
}
