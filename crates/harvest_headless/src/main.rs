//! Headless match runner.
//!
//! Plays matches between the harvest engine and a local world simulator.
//!
//! # Usage
//!
//! ```bash
//! # Run a single match and print its metrics
//! cargo run -p harvest_headless -- run --preset small --seed 3
//!
//! # Stream one report per turn
//! cargo run -p harvest_headless -- run --scenario scenarios/small.ron --turns
//!
//! # Run a batch of seeds
//! cargo run -p harvest_headless -- batch --count 500 --output results/batch.json
//!
//! # Verify determinism
//! cargo run -p harvest_headless -- verify --seed 12345 --runs 5
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use harvest_core::prelude::EngineConfig;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvest_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::MatchRunner,
    scenario::{Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "harvest_headless")]
#[command(about = "Headless match runner for the harvest decision engine")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match
    Run {
        /// Scenario file to load (overrides --preset)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Built-in scenario
        #[arg(long, default_value = "standard")]
        preset: String,

        /// Seed for layout and engine (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Engine config file replacing the scenario's tunables
        #[arg(short, long)]
        engine: Option<PathBuf>,

        /// Print a report line for every turn
        #[arg(long)]
        turns: bool,
    },

    /// Run a batch of seeds
    Batch {
        /// Scenario file to load (overrides --preset)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Built-in scenario
        #[arg(long, default_value = "standard")]
        preset: String,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Write full results to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Scenario file to load (overrides --preset)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Built-in scenario
        #[arg(long, default_value = "standard")]
        preset: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs on stderr, stdout carries JSON results
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let outcome = match cli.command {
        Commands::Run {
            scenario,
            preset,
            seed,
            engine,
            turns,
        } => cmd_run(scenario, &preset, seed, engine, turns),
        Commands::Batch {
            scenario,
            preset,
            count,
            parallel,
            seed,
            output,
        } => cmd_batch(scenario, &preset, count, parallel, seed, output),
        Commands::Verify {
            scenario,
            preset,
            seed,
            runs,
        } => cmd_verify(scenario, &preset, seed, runs),
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

/// Run one match, printing turn reports if asked and the metrics at the end.
fn cmd_run(
    scenario: Option<PathBuf>,
    preset: &str,
    seed: Option<u64>,
    engine: Option<PathBuf>,
    turns: bool,
) -> Result<(), ScenarioError> {
    let mut scenario = Scenario::resolve(scenario.as_deref(), preset)?;
    if let Some(path) = engine {
        scenario.engine = EngineConfig::load(&path)?;
        tracing::info!(path = %path.display(), "Loaded engine config");
    }
    let seed = seed.unwrap_or(scenario.seed);

    let mut runner = MatchRunner::new(&scenario, seed)?;
    if turns {
        while let Some(report) = runner.step() {
            print_json(&report);
        }
    }
    print_json(&runner.run());
    Ok(())
}

/// Run a batch and print the summary.
fn cmd_batch(
    scenario: Option<PathBuf>,
    preset: &str,
    count: u32,
    parallel: u32,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario.as_deref(), preset)?;
    let config = BatchConfig::new(count)
        .with_seed(seed)
        .with_parallel(parallel);

    let results = run_batch(&scenario, config);

    for error in results.errors.iter().take(10) {
        tracing::warn!(
            game = error.game_index,
            seed = error.seed,
            message = %error.message,
            "Match failed"
        );
    }

    if let Some(path) = output {
        results.save(&path)?;
        tracing::info!(path = %path.display(), "Results saved");
    }
    print_json(&results.summary);
    Ok(())
}

/// Replay one seed several times and fail on any divergence.
fn cmd_verify(
    scenario: Option<PathBuf>,
    preset: &str,
    seed: u64,
    runs: u32,
) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario.as_deref(), preset)?;
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    if verify_determinism(&scenario, seed, runs)? {
        eprintln!("PASS: All {} runs produced identical results", runs);
        Ok(())
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize output"),
    }
}
