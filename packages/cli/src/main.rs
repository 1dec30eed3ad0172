#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the disaster map toolchain.
//!
//! Fetches disaster records per category, folds them into the dashboard
//! views and geocodes their locations for the map. Ctrl-C cancels every
//! in-flight request; whatever finished is still printed.
//!
//! Uses `indicatif-log-bridge` (via [`disaster_map_cli_utils::init_logger`])
//! so log lines and progress bars never fight for the terminal.

mod pipeline;
mod render;

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use disaster_map_cli_utils::IndicatifProgress;
use disaster_map_disaster_models::DisasterCategory;
use disaster_map_geocoder::markers::map_points;
use disaster_map_geocoder::nominatim::NominatimClient;
use disaster_map_geocoder::pool::GeocodePool;
use disaster_map_geocoder::service::nominatim_service;
use disaster_map_source::cancel::{CancelToken, run_cancellable};
use disaster_map_source::config::DEFAULT_TIMEOUT_MS;

#[derive(Parser)]
#[command(name = "disaster_map", about = "Natural disaster records explorer")]
struct Cli {
    /// Records API base URL
    #[arg(long, global = true, env = "DISASTER_API_BASE_URL")]
    base_url: Option<String>,
    /// Per-request timeout for the records API, in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every category and print the aggregate views
    Summary {
        /// Comma-separated categories (e.g. "cyclone,flood"). Defaults to all.
        #[arg(long, value_delimiter = ',')]
        types: Vec<DisasterCategory>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Fetch one category for specific years and print its records
    Events {
        /// Category wire name (e.g. "earthquake")
        #[arg(long = "type")]
        category: DisasterCategory,
        /// Comma-separated years (e.g. "2019,2020")
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<u16>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Geocode a single place through Nominatim
    Geocode {
        /// Free-form place (e.g. "Puri, India")
        place: String,
    },
    /// Fetch records, geocode their locations and print map markers
    Map {
        /// Restrict to one category
        #[arg(long = "type")]
        category: Option<DisasterCategory>,
        /// Maximum geocoding lookups in flight
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List the disaster categories
    Categories,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

/// Cancels `cancel` on the first Ctrl-C.
fn cancel_on_ctrl_c(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling in-flight requests");
            cancel.cancel();
        }
    });
}

fn warn_partial(warning: Option<&str>, cancel: &CancelToken) {
    if let Some(warning) = warning {
        log::warn!("{warning}");
    }
    if cancel.is_cancelled() {
        log::warn!("Cancelled; results are partial");
    }
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = disaster_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Categories => {
            println!("{}", render::categories_table());
        }
        Commands::Geocode { place } => {
            let client = NominatimClient::new(&nominatim_service())?;
            match run_cancellable(&cancel, disaster_map_geocoder::geocode(&client, &place)).await {
                Some(Some(point)) => println!("{:.5}, {:.5}", point.lat, point.lng),
                Some(None) => println!("not found"),
                None => log::warn!("Cancelled"),
            }
        }
        Commands::Summary { types, format } => {
            let source = pipeline::http_source(cli.base_url.as_deref(), cli.timeout_ms)?;
            let categories = pipeline::selected_categories(&types);
            let progress = IndicatifProgress::fetch_bar(&multi, "Fetching categories");

            let summary = pipeline::summarize(&source, &categories, &cancel, &progress).await;
            warn_partial(summary.warning.as_deref(), &cancel);
            log::info!("Built views from {} records", summary.record_count);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary.views)?),
                OutputFormat::Table => {
                    println!("{}", render::views_table(&summary.views, &categories));
                }
            }
        }
        Commands::Events {
            category,
            years,
            format,
        } => {
            let source = pipeline::http_source(cli.base_url.as_deref(), cli.timeout_ms)?;
            let loaded = pipeline::load_years(&source, category, &years, &cancel).await;
            warn_partial(loaded.warning.as_deref(), &cancel);

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&loaded.records)?);
                }
                OutputFormat::Table => println!("{}", render::records_table(&loaded.records)),
            }
        }
        Commands::Map {
            category,
            concurrency,
            format,
        } => {
            let source = pipeline::http_source(cli.base_url.as_deref(), cli.timeout_ms)?;
            let categories = pipeline::selected_categories(category.as_slice());
            let progress = IndicatifProgress::fetch_bar(&multi, "Fetching categories");
            let loaded = pipeline::load_categories(&source, &categories, &cancel, &progress).await;
            warn_partial(loaded.warning.as_deref(), &cancel);

            let service = nominatim_service();
            let mut pool_config = service.pool_config();
            if let Some(concurrency) = concurrency {
                pool_config.concurrency = concurrency.max(1);
            }
            let pool = GeocodePool::new(Arc::new(NominatimClient::new(&service)?), pool_config);

            let progress = IndicatifProgress::geocode_bar(&multi, "Geocoding");
            let report = map_points(&loaded.records, &pool, &cancel, &progress).await;
            if report.cancelled {
                log::warn!("Geocoding cancelled; the map is partial");
            }
            if !report.unresolved.is_empty() {
                log::warn!("{} places could not be placed", report.unresolved.len());
            }

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report.points)?);
                }
                OutputFormat::Table => println!("{}", render::points_table(&report.points)),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_category_lists() {
        let cli = Cli::try_parse_from([
            "disaster_map",
            "summary",
            "--types",
            "cyclone,forestfire",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Summary { types, format } = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(
            types,
            [DisasterCategory::Cyclone, DisasterCategory::ForestFire]
        );
        assert!(matches!(format, OutputFormat::Json));
    }

    #[test]
    fn parses_single_category_and_years() {
        let cli = Cli::try_parse_from([
            "disaster_map",
            "events",
            "--type",
            "earthquake",
            "--years",
            "2019,2020",
        ])
        .unwrap();
        let Commands::Events {
            category, years, ..
        } = cli.command
        else {
            panic!("expected events");
        };
        assert_eq!(category, DisasterCategory::Earthquake);
        assert_eq!(years, [2019, 2020]);
    }

    #[test]
    fn rejects_unknown_category() {
        assert!(Cli::try_parse_from(["disaster_map", "map", "--type", "tsunami"]).is_err());
    }
}
