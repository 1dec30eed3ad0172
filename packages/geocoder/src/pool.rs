//! Bounded, memoized, cancellable geocoding.
//!
//! [`GeocodePool::resolve_all`] replaces a one-at-a-time lookup loop: the
//! distinct place strings are dispatched through `buffer_unordered` with at
//! most [`PoolConfig::concurrency`] lookups in flight, and every lookup is
//! bounded by [`PoolConfig::lookup_timeout`]. Answers (hits and misses) are
//! memoized for the lifetime of the pool; errors are not, so a later call
//! retries them.
//!
//! The pool drives retries itself. Every HTTP attempt, retries included,
//! waits for a start slot [`PoolConfig::min_interval`] after the previous
//! one and is charged to [`PoolConfig::request_budget`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use disaster_map_disaster_models::GeoPoint;
use disaster_map_source::cancel::{CancelToken, run_cancellable};
use disaster_map_source::progress::ProgressCallback;
use disaster_map_source::retry::RetryPolicy;
use futures::stream::{self, StreamExt as _};
use tokio::time::Instant;

use crate::{GeocodeError, Geocoder};

/// Pool limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum lookups in flight.
    pub concurrency: usize,
    /// Upper bound for a single lookup, retries and backoff included.
    pub lookup_timeout: Duration,
    /// Maximum HTTP requests this pool will ever issue.
    pub request_budget: u32,
    /// Minimum spacing between request starts.
    pub min_interval: Duration,
    /// Backoff for rate-limited and transient failures.
    pub retry: RetryPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            lookup_timeout: Duration::from_secs(10),
            request_budget: 500,
            min_interval: Duration::from_secs(1),
            retry: RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(8),
            },
        }
    }
}

/// Outcome of a [`GeocodePool::resolve_all`] batch.
#[derive(Debug, Default)]
pub struct GeocodeReport {
    /// Resolved places. `None` means the geocoder found no match.
    pub points: BTreeMap<String, Option<GeoPoint>>,
    /// Places whose lookup failed, with the reason.
    pub failures: BTreeMap<String, GeocodeError>,
}

impl GeocodeReport {
    /// Coordinates for `place`, if it resolved.
    #[must_use]
    pub fn point(&self, place: &str) -> Option<GeoPoint> {
        self.points.get(place).copied().flatten()
    }

    /// Places that did not resolve to a point, whether by miss or failure.
    #[must_use]
    pub fn unresolved(&self) -> Vec<&str> {
        self.points
            .iter()
            .filter(|(_, point)| point.is_none())
            .map(|(place, _)| place.as_str())
            .chain(self.failures.keys().map(String::as_str))
            .collect()
    }

    /// Number of places that were cancelled before they resolved.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.failures
            .values()
            .filter(|e| matches!(e, GeocodeError::Cancelled))
            .count()
    }
}

/// A geocoder wrapped with concurrency, rate, time and budget limits.
pub struct GeocodePool {
    geocoder: Arc<dyn Geocoder>,
    config: PoolConfig,
    memo: Mutex<BTreeMap<String, Option<GeoPoint>>>,
    budget: AtomicU32,
    next_start: Mutex<Option<Instant>>,
}

impl GeocodePool {
    /// Creates a pool around `geocoder`.
    #[must_use]
    pub fn new(geocoder: Arc<dyn Geocoder>, config: PoolConfig) -> Self {
        Self {
            geocoder,
            budget: AtomicU32::new(config.request_budget),
            config,
            memo: Mutex::new(BTreeMap::new()),
            next_start: Mutex::new(None),
        }
    }

    /// Lookups left in the request budget.
    #[must_use]
    pub fn remaining_budget(&self) -> u32 {
        self.budget.load(Ordering::SeqCst)
    }

    /// Resolves a single place, collapsing every failure to `None`.
    pub async fn resolve(&self, place: &str) -> Option<GeoPoint> {
        match self.try_resolve(place).await {
            Ok(point) => point,
            Err(e) => {
                log::warn!("Geocoding error for '{place}': {e}");
                None
            }
        }
    }

    /// Resolves a single place through the memo table and pool limits.
    ///
    /// Rate-limited and transient failures are retried with backoff while
    /// the retry policy, the budget and the lookup deadline allow. A retry
    /// whose backoff would end past the deadline is not attempted; the last
    /// error is returned instead.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::BudgetExhausted`] if the budget is used up,
    /// [`GeocodeError::Timeout`] if a request is still pending at the
    /// deadline, or the geocoder's own error once retries are exhausted.
    pub async fn try_resolve(&self, place: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        if let Some(hit) = self.memo_get(place) {
            return Ok(hit);
        }

        let deadline = Instant::now() + self.config.lookup_timeout;
        let retry = self.config.retry;
        let mut attempt = 0;

        loop {
            match self.attempt(place, deadline).await {
                Ok(point) => {
                    self.memo_lock().insert(place.to_string(), point);
                    return Ok(point);
                }
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay = retry.delay_for(attempt);
                    if Instant::now() + delay >= deadline {
                        log::debug!("Geocoder: no time left to retry '{place}' after {e}");
                        return Err(e);
                    }
                    log::warn!(
                        "Geocoder: {e} for '{place}', retry {attempt}/{} in {delay:?}",
                        retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One HTTP request: waits for a start slot, charges the budget, then
    /// looks `place` up, all before `deadline`.
    async fn attempt(
        &self,
        place: &str,
        deadline: Instant,
    ) -> Result<Option<GeoPoint>, GeocodeError> {
        tokio::time::timeout_at(deadline, async {
            self.wait_for_slot().await;
            self.take_budget()?;
            self.geocoder.lookup(place).await
        })
        .await
        .map_err(|_| GeocodeError::Timeout(self.config.lookup_timeout))?
    }

    fn take_budget(&self) -> Result<(), GeocodeError> {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| GeocodeError::BudgetExhausted)
    }

    /// Resolves every distinct place in `places`.
    ///
    /// Duplicates are looked up once. When `cancel` fires, in-flight
    /// lookups are dropped and every unresolved place is reported as
    /// [`GeocodeError::Cancelled`].
    pub async fn resolve_all<S: AsRef<str>>(
        &self,
        places: &[S],
        cancel: &CancelToken,
        progress: &Arc<dyn ProgressCallback>,
    ) -> GeocodeReport {
        let distinct: BTreeSet<&str> = places.iter().map(AsRef::as_ref).collect();
        progress.set_total(distinct.len() as u64);
        progress.set_message("Geocoding".to_string());

        log::info!(
            "Geocoding {} distinct places ({} requested, concurrency={})",
            distinct.len(),
            places.len(),
            self.config.concurrency
        );

        let outcomes: Vec<(&str, Result<Option<GeoPoint>, GeocodeError>)> =
            stream::iter(distinct.into_iter().map(|place| async move {
                let result = run_cancellable(cancel, self.try_resolve(place))
                    .await
                    .unwrap_or(Err(GeocodeError::Cancelled));
                progress.inc(1);
                (place, result)
            }))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = GeocodeReport::default();
        for (place, result) in outcomes {
            match result {
                Ok(point) => {
                    if point.is_none() {
                        log::debug!("Geocoder: no match for '{place}'");
                    }
                    report.points.insert(place.to_string(), point);
                }
                Err(e) => {
                    if !matches!(e, GeocodeError::Cancelled) {
                        log::warn!("Geocoding error for '{place}': {e}");
                    }
                    report.failures.insert(place.to_string(), e);
                }
            }
        }

        progress.finish(format!(
            "Geocoded {} places ({} unresolved)",
            report.points.len() + report.failures.len(),
            report.unresolved().len()
        ));
        report
    }

    fn memo_lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Option<GeoPoint>>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn memo_get(&self, place: &str) -> Option<Option<GeoPoint>> {
        self.memo_lock().get(place).copied()
    }

    /// Reserves the next start slot and sleeps until it arrives.
    async fn wait_for_slot(&self) {
        if self.config.min_interval.is_zero() {
            return;
        }
        let start = {
            let mut next = self
                .next_start
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let start = next.map_or(now, |slot| slot.max(now));
            *next = Some(start + self.config.min_interval);
            start
        };
        tokio::time::sleep_until(start).await;
    }
}
