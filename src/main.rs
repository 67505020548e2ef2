//! Badge Occupancy - Binary Entry Point
//!
//! ```text
//! occupancy ingest   <FILE>...            append bulk files to the active log
//! occupancy snapshot                      publish a consumer snapshot
//! occupancy report   <CONFIG> [CUTOFF]    snapshot, then print the JSON report
//! occupancy status                        print store counts
//! occupancy reset    <active|snapshot|backup>
//! ```
//!
//! The data directory defaults to `data` and can be set with `--data-dir`
//! or `OCCUPANCY_DATA_DIR`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use badge_occupancy::ingest::ingest_file;
use badge_occupancy::utils::parse_timestamp;
use badge_occupancy::{DistributionEngine, EventStore, EventStoreConfig, LogTarget};

/// Badge-swipe event store and zone occupancy reports
#[derive(Parser, Debug)]
#[command(name = "occupancy", version)]
struct Cli {
    /// Directory holding the active log, snapshot and backup
    #[arg(long, env = "OCCUPANCY_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append bulk files (.csv, .json, otherwise pipe-delimited) to the active log
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Publish a consumer snapshot of the active log
    Snapshot,

    /// Publish a snapshot, then print the occupancy report as JSON
    Report {
        /// Site configuration (YAML)
        config: PathBuf,

        /// Only replay events at or before this time
        #[arg(value_parser = parse_cutoff)]
        cutoff: Option<NaiveDateTime>,
    },

    /// Print store state and event counts
    Status,

    /// Reinitialize one log file to an empty document
    Reset {
        /// active, snapshot or backup
        target: LogTarget,
    },
}

fn parse_cutoff(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).ok_or_else(|| format!("invalid cutoff timestamp '{}'", raw))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = EventStore::open(EventStoreConfig::new(&cli.data_dir))
        .with_context(|| format!("opening event store in {}", cli.data_dir.display()))?;

    match cli.command {
        Command::Ingest { files } => {
            let mut total = 0;
            for path in &files {
                total += ingest_file(&store, path)
                    .with_context(|| format!("ingesting {}", path.display()))?;
            }
            info!(total, files = files.len(), "Ingestion finished");
        }
        Command::Snapshot => {
            let report = store.publish_snapshot().context("publishing snapshot")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Report { config, cutoff } => {
            store.publish_snapshot().context("publishing snapshot")?;
            let engine = DistributionEngine::load(&store, &config)
                .with_context(|| format!("loading {}", config.display()))?;
            println!("{}", serde_json::to_string_pretty(&engine.report(cutoff))?);
        }
        Command::Status => {
            println!("{}", store.status().summary());
        }
        Command::Reset { target } => {
            store.reset(target)?;
        }
    }

    Ok(())
}
