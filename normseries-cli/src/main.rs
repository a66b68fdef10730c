//! normseries CLI: run one ingestion pass or inspect the persisted series.
//!
//! Commands:
//! - `run` (default when no subcommand is given): fetch VOO/QQQ closes,
//!   append new normalized rows, save
//! - `status`: summarize the persisted document without touching the network
//!
//! Exits 0 on success, including "no new rows" and "base close pending".

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use normseries_core::data::StooqSource;
use normseries_core::{run_once, IngestConfig, MergeOutcome, SeriesStatus, SeriesStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "normseries",
    about = "Append base-date normalized VOO/QQQ closes to a JSON series"
)]
struct Cli {
    /// TOML config file overriding the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output JSON path. Overrides the config file.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, merge and save (the default).
    Run {
        /// Compute the merge but do not write the file.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Print a summary of the persisted series.
    Status,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.output)?;

    match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => run_ingest(&config, dry_run),
        Commands::Status => run_status(&config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, output: Option<PathBuf>) -> Result<IngestConfig> {
    let mut config = match path {
        Some(path) => IngestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IngestConfig::default(),
    };
    if let Some(output) = output {
        config.output = output;
        config.validate()?;
    }
    Ok(config)
}

fn run_ingest(config: &IngestConfig, dry_run: bool) -> Result<()> {
    let source = StooqSource::new(config)?;
    let summary = run_once(config, &source, dry_run)?;

    match summary.outcome {
        MergeOutcome::BasePending { .. } => {
            println!("Base close missing for the base date. Will wait until available.");
        }
        MergeOutcome::NoNewRows => println!("No new rows to append."),
        MergeOutcome::Appended { count, last } => {
            let verb = if summary.persisted { "Appended" } else { "Would append" };
            println!("{verb} {count} rows. Last: {last}");
        }
    }
    Ok(())
}

fn run_status(config: &IngestConfig) -> Result<()> {
    let store = SeriesStore::from_config(config);
    let status = SeriesStatus::read(&store)?;
    println!("{status}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_means_default_run() {
        let cli = Cli::try_parse_from(["normseries"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn output_override_applies() {
        let config = load_config(None, Some(PathBuf::from("out/s.json"))).unwrap();
        assert_eq!(config.output, PathBuf::from("out/s.json"));
    }

    #[test]
    fn parses_dry_run_and_global_flags() {
        let cli =
            Cli::try_parse_from(["normseries", "run", "--dry-run", "--output", "x.json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { dry_run: true })));
        assert_eq!(cli.output, Some(PathBuf::from("x.json")));
    }
}
