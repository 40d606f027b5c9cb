#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime hotspot analytics engine.
//!
//! Reads an incident CSV, builds an [`AnalyticsEngine`], applies the filter
//! described by the command-line flags, and prints the result.

mod filter_args;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crime_hotspots_analytics::AnalyticsEngine;
use crime_hotspots_ingest::{IngestError, load_with_options, read_csv_path};

use crate::filter_args::FilterArgs;

#[derive(Parser)]
#[command(name = "crime_hotspots", about = "Crime incident hotspot analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an incident CSV and print the ingestion report as JSON
    Validate {
        /// Incident CSV file
        input: PathBuf,
        /// Engine configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Compute the analysis snapshot for a filter and print it as JSON
    Snapshot {
        /// Incident CSV file
        input: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List the hotspots for a filter
    Hotspots {
        /// Incident CSV file
        input: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { input, config } => {
            let filter = FilterArgs {
                config,
                ..FilterArgs::default()
            };
            let config = filter.engine_config()?;
            let rows = read_csv_path(&input)?;

            match load_with_options(rows, config.ingest_options()) {
                Ok(records) => {
                    println!("{}", serde_json::to_string_pretty(records.report())?);
                }
                Err(IngestError::DataIntegrity { report, .. }) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    return Err(format!("{}: no valid records", input.display()).into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Snapshot {
            input,
            filter,
            pretty,
        } => {
            let mut engine = build_engine(&input, &filter)?;
            let state = filter.filter_state(engine.config());
            let snapshot = engine.apply_filter(state)?;

            let json = if pretty {
                serde_json::to_string_pretty(snapshot.as_ref())?
            } else {
                serde_json::to_string(snapshot.as_ref())?
            };
            println!("{json}");
        }
        Commands::Hotspots { input, filter } => {
            let mut engine = build_engine(&input, &filter)?;
            let state = filter.filter_state(engine.config());
            let snapshot = engine.apply_filter(state)?;

            println!(
                "{:<8} {:>6} {:>11} {:>12} {:>8}  TOP CATEGORY",
                "CLUSTER", "SIZE", "LATITUDE", "LONGITUDE", "ARRESTS"
            );
            println!("{}", "-".repeat(72));
            for summary in &snapshot.cluster_summaries {
                let top = summary
                    .category_distribution
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map_or("", |(category, _)| category.as_str());
                println!(
                    "{:<8} {:>6} {:>11.5} {:>12.5} {:>7.1}%  {top}",
                    summary.cluster_id,
                    summary.size,
                    summary.centroid_latitude,
                    summary.centroid_longitude,
                    summary.arrest_rate * 100.0,
                );
            }
            println!();
            println!(
                "{} records, {} hotspots, {} noise ({:.1}%)",
                snapshot.filtered_record_count,
                snapshot.active_hotspots,
                snapshot.noise_count,
                snapshot.noise_ratio * 100.0
            );
        }
    }

    Ok(())
}

fn build_engine(
    input: &std::path::Path,
    filter: &FilterArgs,
) -> Result<AnalyticsEngine, Box<dyn std::error::Error>> {
    let config = filter.engine_config()?;
    let rows = read_csv_path(input)?;
    log::info!("Read {} rows from {}", rows.len(), input.display());
    Ok(AnalyticsEngine::load(rows, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory as _;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_filter_flags() {
        let cli = Cli::try_parse_from([
            "crime_hotspots",
            "snapshot",
            "incidents.csv",
            "--category",
            "theft",
            "--category",
            "battery",
            "--cluster",
            "3",
            "--bbox",
            "41.8,-87.7,42.0,-87.5",
            "--window-days",
            "60",
        ])
        .unwrap();

        let Commands::Snapshot { input, filter, pretty } = cli.command else {
            panic!("expected snapshot command");
        };
        assert_eq!(input, PathBuf::from("incidents.csv"));
        assert!(!pretty);
        assert_eq!(filter.categories, ["theft", "battery"]);
        assert_eq!(filter.clusters, [3]);
        assert_eq!(filter.window_days, Some(60));
        assert!(filter.bbox.is_some());
    }

    #[test]
    fn rejects_malformed_bbox_flag() {
        assert!(
            Cli::try_parse_from(["crime_hotspots", "hotspots", "x.csv", "--bbox", "1,2,3"]).is_err()
        );
    }
}
