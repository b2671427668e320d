//! Ball Arena - command-line front-end for the batch harness

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;

use ball_arena::ArenaConfig;
use ball_arena::sim::Archetype;
use ball_arena::tournament::{self, DEFAULT_MATCHES, TournamentConfig};

#[derive(Parser, Debug)]
#[command(name = "ball-arena")]
#[command(about = "Deterministic arena battles between weapon-carrying balls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a single match and print the result
    Match {
        /// Left-side archetype
        a: Archetype,
        /// Right-side archetype
        b: Archetype,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// JSON file overriding arena settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Round-robin every archetype pairing and rank the results
    Tournament {
        #[arg(long, default_value_t = DEFAULT_MATCHES)]
        matches: u32,
        #[arg(long, default_value_t = 0)]
        base_seed: u64,
        /// Worker threads (defaults to one per core)
        #[arg(long)]
        jobs: Option<usize>,
        /// Comma-separated archetypes (defaults to all)
        #[arg(long, value_delimiter = ',')]
        archetypes: Vec<Archetype>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<ArenaConfig> {
    let config = match path {
        Some(path) => ArenaConfig::load(path)
            .with_context(|| format!("failed loading config {}", path.display()))?,
        None => ArenaConfig::default(),
    };
    config.validate().context("invalid arena configuration")?;
    Ok(config)
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed serializing report")?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed writing {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Match { a, b, seed, config } => {
            let config = load_config(config.as_deref())?;
            let result = tournament::run_match(a, b, seed, &config);
            emit(&result, None)
        }
        Commands::Tournament {
            matches,
            base_seed,
            jobs,
            archetypes,
            config,
            output,
        } => {
            if jobs == Some(0) {
                return Err(anyhow!("--jobs must be at least 1"));
            }
            let arena = load_config(config.as_deref())?;
            let archetypes = if archetypes.is_empty() {
                Archetype::ALL.to_vec()
            } else {
                archetypes
            };
            let report = tournament::run_tournament(&TournamentConfig {
                archetypes,
                matches,
                base_seed,
                jobs,
                arena,
            })?;
            emit(&report, output.as_deref())
        }
    }
}
