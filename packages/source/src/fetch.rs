//! Concurrent, per-unit fetching from the records API.
//!
//! [`fetch_categories`] issues one request per category and
//! [`fetch_years`] one request per year of a single category. All units run
//! concurrently and finish independently: a failed or cancelled unit is
//! recorded in the report alongside the successful ones instead of
//! aborting the batch.

use std::sync::Arc;

use async_trait::async_trait;
use disaster_map_disaster_models::{DisasterCategory, DisasterRecord};
use futures::future::join_all;
use serde_json::Value;

use crate::cancel::{CancelToken, run_cancellable};
use crate::config::ApiConfig;
use crate::normalize::normalize_rows;
use crate::progress::ProgressCallback;
use crate::{RecordSource, SourceError, retry};

/// [`RecordSource`] backed by the HTTP records API.
pub struct HttpRecordSource {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpRecordSource {
    /// Creates a source for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, SourceError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    async fn get_rows(
        &self,
        category: DisasterCategory,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, SourceError> {
        let url = self.config.disasters_url();
        let body = retry::send_json(&self.config.retry, || self.client.get(&url).query(query))
            .await?;
        Ok(rows_from_body(category, body))
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_category(&self, category: DisasterCategory) -> Result<Vec<Value>, SourceError> {
        self.get_rows(category, &[("type", category.to_string())])
            .await
    }

    async fn fetch_category_year(
        &self,
        category: DisasterCategory,
        year: u16,
    ) -> Result<Vec<Value>, SourceError> {
        self.get_rows(
            category,
            &[("year", year.to_string()), ("type", category.to_string())],
        )
        .await
    }
}

/// Unwraps a response body into rows. Anything but a JSON array is treated
/// as "no rows".
#[must_use]
pub fn rows_from_body(category: DisasterCategory, body: Value) -> Vec<Value> {
    match body {
        Value::Array(rows) => rows,
        Value::Null => {
            log::warn!("{category}: response body missing, treating as 0 rows");
            Vec::new()
        }
        other => {
            log::warn!(
                "{category}: response body is not an array ({}), treating as 0 rows",
                json_kind(&other)
            );
            Vec::new()
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Outcome of fetching one category.
#[derive(Debug)]
pub struct CategoryFetch {
    /// The category that was requested.
    pub category: DisasterCategory,
    /// Raw rows, or why the category could not be fetched.
    pub result: Result<Vec<Value>, SourceError>,
}

/// Outcome of a [`fetch_categories`] batch, one entry per requested
/// category in request order.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Per-category outcomes.
    pub units: Vec<CategoryFetch>,
}

impl FetchReport {
    /// Categories that failed or were cancelled, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (DisasterCategory, &SourceError)> {
        self.units
            .iter()
            .filter_map(|u| u.result.as_ref().err().map(|e| (u.category, e)))
    }

    /// Categories that failed or were cancelled.
    #[must_use]
    pub fn failed_categories(&self) -> Vec<DisasterCategory> {
        self.failures().map(|(category, _)| category).collect()
    }

    /// Total raw rows across successful categories.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.units
            .iter()
            .filter_map(|u| u.result.as_ref().ok())
            .map(Vec::len)
            .sum()
    }

    /// Normalizes the rows of every successful category.
    #[must_use]
    pub fn records(&self) -> Vec<DisasterRecord> {
        self.units
            .iter()
            .filter_map(|u| u.result.as_ref().ok().map(|rows| (u.category, rows)))
            .flat_map(|(category, rows)| normalize_rows(category, rows))
            .collect()
    }

    /// A one-line warning naming every failed category, or `None` if all
    /// categories succeeded.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        let failed: Vec<String> = self
            .failures()
            .map(|(category, e)| format!("{category} ({e})"))
            .collect();
        (!failed.is_empty()).then(|| format!("Failed to fetch: {}", failed.join(", ")))
    }
}

/// Fetches every category concurrently.
///
/// Each category succeeds or fails on its own. Once `cancel` fires,
/// outstanding categories are reported as [`SourceError::Cancelled`].
pub async fn fetch_categories(
    source: &dyn RecordSource,
    categories: &[DisasterCategory],
    cancel: &CancelToken,
    progress: &Arc<dyn ProgressCallback>,
) -> FetchReport {
    progress.set_total(categories.len() as u64);
    progress.set_message("Fetching categories".to_string());

    let units = join_all(categories.iter().map(|&category| async move {
        let result = run_cancellable(cancel, source.fetch_category(category))
            .await
            .unwrap_or(Err(SourceError::Cancelled));

        match &result {
            Ok(rows) => log::info!("{category}: fetched {} rows", rows.len()),
            Err(SourceError::Cancelled) => log::info!("{category}: cancelled"),
            Err(e) => log::error!("{category}: fetch failed: {e}"),
        }
        progress.inc(1);

        CategoryFetch { category, result }
    }))
    .await;

    let report = FetchReport { units };
    progress.finish(format!(
        "Fetched {} rows ({} categories failed)",
        report.row_count(),
        report.failed_categories().len()
    ));
    report
}

/// Outcome of fetching one year of a category.
#[derive(Debug)]
pub struct YearFetch {
    /// The requested year.
    pub year: u16,
    /// Raw rows, or why the year could not be fetched.
    pub result: Result<Vec<Value>, SourceError>,
}

/// Outcome of a [`fetch_years`] batch.
#[derive(Debug)]
pub struct YearReport {
    /// The category every year was fetched for.
    pub category: DisasterCategory,
    /// Per-year outcomes in ascending year order.
    pub units: Vec<YearFetch>,
}

impl YearReport {
    /// Years that failed or were cancelled.
    #[must_use]
    pub fn failed_years(&self) -> Vec<u16> {
        self.units
            .iter()
            .filter(|u| u.result.is_err())
            .map(|u| u.year)
            .collect()
    }

    /// Normalized records of every successful year, in year order.
    #[must_use]
    pub fn records(&self) -> Vec<DisasterRecord> {
        self.units
            .iter()
            .filter_map(|u| u.result.as_ref().ok())
            .flat_map(|rows| normalize_rows(self.category, rows))
            .collect()
    }
}

/// Fetches one category for several years concurrently.
///
/// Duplicate years are requested once. Failed years are logged and
/// reported; the rows of the other years are kept.
pub async fn fetch_years(
    source: &dyn RecordSource,
    category: DisasterCategory,
    years: &[u16],
    cancel: &CancelToken,
) -> YearReport {
    let mut years = years.to_vec();
    years.sort_unstable();
    years.dedup();

    let units = join_all(years.into_iter().map(|year| async move {
        let result = run_cancellable(cancel, source.fetch_category_year(category, year))
            .await
            .unwrap_or(Err(SourceError::Cancelled));

        if let Err(e) = &result {
            log::error!("Failed to fetch {category} for {year}: {e}");
        }

        YearFetch { year, result }
    }))
    .await;

    YearReport { category, units }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::progress::null_progress;

    /// In-memory source; categories without rows fail with HTTP 503.
    struct FakeSource {
        rows: BTreeMap<DisasterCategory, Vec<Value>>,
        delay: Duration,
    }

    impl FakeSource {
        fn new(rows: BTreeMap<DisasterCategory, Vec<Value>>) -> Self {
            Self {
                rows,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn fetch_category(
            &self,
            category: DisasterCategory,
        ) -> Result<Vec<Value>, SourceError> {
            tokio::time::sleep(self.delay).await;
            self.rows
                .get(&category)
                .cloned()
                .ok_or_else(|| SourceError::Status {
                    status: 503,
                    url: format!("fake://disasters?type={category}"),
                })
        }

        async fn fetch_category_year(
            &self,
            category: DisasterCategory,
            year: u16,
        ) -> Result<Vec<Value>, SourceError> {
            let rows = self.fetch_category(category).await?;
            Ok(rows
                .into_iter()
                .filter(|r| r["date"].as_str().is_some_and(|d| d.ends_with(&year.to_string())))
                .collect())
        }
    }

    #[tokio::test]
    async fn one_failed_category_keeps_the_others() {
        let mut rows = BTreeMap::new();
        rows.insert(
            DisasterCategory::Cyclone,
            vec![json!({"date": "20-5-2020", "deaths": "90"})],
        );
        rows.insert(DisasterCategory::Flood, vec![]);
        let source = FakeSource::new(rows);

        let report = fetch_categories(
            &source,
            &[
                DisasterCategory::Cyclone,
                DisasterCategory::Flood,
                DisasterCategory::Drought,
            ],
            &CancelToken::new(),
            &null_progress(),
        )
        .await;

        assert_eq!(report.units.len(), 3);
        assert_eq!(report.failed_categories(), vec![DisasterCategory::Drought]);
        assert_eq!(report.row_count(), 1);
        assert_eq!(report.records()[0].deaths, 90);
        assert!(report.warning().unwrap().contains("drought"));
    }

    #[tokio::test]
    async fn all_succeeded_has_no_warning() {
        let rows = DisasterCategory::all()
            .iter()
            .map(|c| (*c, Vec::new()))
            .collect();
        let source = FakeSource::new(rows);
        let report = fetch_categories(
            &source,
            DisasterCategory::all(),
            &CancelToken::new(),
            &null_progress(),
        )
        .await;
        assert!(report.warning().is_none());
        assert!(report.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_marks_pending_units() {
        let mut rows = BTreeMap::new();
        rows.insert(DisasterCategory::Cyclone, vec![json!({"date": "1-1-2001"})]);
        let source = FakeSource {
            rows,
            delay: Duration::from_secs(60),
        };
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        let report = fetch_categories(
            &source,
            &[DisasterCategory::Cyclone],
            &cancel,
            &null_progress(),
        )
        .await;
        assert!(matches!(
            report.units[0].result,
            Err(SourceError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn fetch_years_dedups_and_orders() {
        let mut rows = BTreeMap::new();
        rows.insert(
            DisasterCategory::Earthquake,
            vec![
                json!({"date": "26-1-2001", "deaths": 13805}),
                json!({"date": "8-10-2005", "deaths": 1309}),
            ],
        );
        let source = FakeSource::new(rows);
        let report = fetch_years(
            &source,
            DisasterCategory::Earthquake,
            &[2005, 2001, 2005],
            &CancelToken::new(),
        )
        .await;

        let years: Vec<u16> = report.units.iter().map(|u| u.year).collect();
        assert_eq!(years, vec![2001, 2005]);
        let records = report.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].year, 2001);
        assert!(report.failed_years().is_empty());
    }

    #[test]
    fn non_array_body_is_empty() {
        assert!(rows_from_body(DisasterCategory::Flood, json!({"error": "x"})).is_empty());
        assert!(rows_from_body(DisasterCategory::Flood, Value::Null).is_empty());
        assert_eq!(
            rows_from_body(DisasterCategory::Flood, json!([{"a": 1}])).len(),
            1
        );
    }

    #[tokio::test]
    async fn unreachable_api_fails_every_category_independently() {
        let config = ApiConfig::new("http://127.0.0.1:9")
            .unwrap()
            .with_retry(crate::retry::RetryPolicy::none());
        let source = HttpRecordSource::new(config).unwrap();
        let report = fetch_categories(
            &source,
            DisasterCategory::all(),
            &CancelToken::new(),
            &null_progress(),
        )
        .await;
        assert_eq!(report.failed_categories().len(), 5);
        assert!(report.records().is_empty());
    }
}
