//! Fetch -> normalize -> aggregate, shared by the subcommands.
//!
//! Every step here is tolerant of partial failure: a category or year that
//! could not be fetched is named in a warning and the views are built from
//! whatever did arrive.

use std::sync::Arc;
use std::time::Duration;

use disaster_map_analytics::aggregate_for;
use disaster_map_analytics_models::AggregateViews;
use disaster_map_disaster_models::{DisasterCategory, DisasterRecord};
use disaster_map_source::cancel::CancelToken;
use disaster_map_source::config::ApiConfig;
use disaster_map_source::fetch::{HttpRecordSource, fetch_categories, fetch_years};
use disaster_map_source::progress::ProgressCallback;
use disaster_map_source::{RecordSource, SourceError};

/// Builds the HTTP records source.
///
/// `base_url` wins over the environment; the timeout applies to every
/// request.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if no valid base URL is available.
pub fn http_source(base_url: Option<&str>, timeout_ms: u64) -> Result<HttpRecordSource, SourceError> {
    let config = match base_url {
        Some(url) => ApiConfig::new(url)?,
        None => ApiConfig::from_env()?,
    };
    HttpRecordSource::new(config.with_timeout(Duration::from_millis(timeout_ms)))
}

/// Categories selected on the command line, defaulting to all of them.
/// Duplicates are dropped, order is preserved.
#[must_use]
pub fn selected_categories(requested: &[DisasterCategory]) -> Vec<DisasterCategory> {
    if requested.is_empty() {
        return DisasterCategory::all().to_vec();
    }
    let mut selected = Vec::with_capacity(requested.len());
    for category in requested {
        if !selected.contains(category) {
            selected.push(*category);
        }
    }
    selected
}

/// Normalized records plus a warning for whatever failed.
#[derive(Debug)]
pub struct Loaded {
    /// Records of every unit that succeeded.
    pub records: Vec<DisasterRecord>,
    /// One-line description of failed units, if any.
    pub warning: Option<String>,
}

/// Result of the `summary` pipeline.
#[derive(Debug)]
pub struct Summary {
    /// The aggregate views.
    pub views: AggregateViews,
    /// Number of normalized records the views were built from.
    pub record_count: usize,
    /// One-line description of failed categories, if any.
    pub warning: Option<String>,
}

/// Fetches and normalizes every category in `categories`.
pub async fn load_categories(
    source: &dyn RecordSource,
    categories: &[DisasterCategory],
    cancel: &CancelToken,
    progress: &Arc<dyn ProgressCallback>,
) -> Loaded {
    let report = fetch_categories(source, categories, cancel, progress).await;
    let records = report.records();
    log::info!(
        "Normalized {} of {} rows",
        records.len(),
        report.row_count()
    );
    Loaded {
        records,
        warning: report.warning(),
    }
}

/// Fetches and normalizes one category for the given years.
pub async fn load_years(
    source: &dyn RecordSource,
    category: DisasterCategory,
    years: &[u16],
    cancel: &CancelToken,
) -> Loaded {
    let report = fetch_years(source, category, years, cancel).await;
    let failed = report.failed_years();
    let warning = (!failed.is_empty()).then(|| {
        let years: Vec<String> = failed.iter().map(ToString::to_string).collect();
        format!("Failed to fetch {category} for: {}", years.join(", "))
    });
    Loaded {
        records: report.records(),
        warning,
    }
}

/// Runs fetch -> normalize -> aggregate over `categories`.
pub async fn summarize(
    source: &dyn RecordSource,
    categories: &[DisasterCategory],
    cancel: &CancelToken,
    progress: &Arc<dyn ProgressCallback>,
) -> Summary {
    let loaded = load_categories(source, categories, cancel, progress).await;
    Summary {
        views: aggregate_for(&loaded.records, categories),
        record_count: loaded.records.len(),
        warning: loaded.warning,
    }
}
