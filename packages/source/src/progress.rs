//! Progress reporting for fetch and geocode batches.
//!
//! Library code reports through [`ProgressCallback`] and never renders
//! anything itself; the CLI plugs in `indicatif` bars, tests use
//! [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a batch of units (categories, years,
/// geocode lookups).
///
/// Implementations must be `Send + Sync` so a single callback can be shared
/// by concurrently running units.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of units in the batch.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` completed units.
    fn inc(&self, delta: u64);

    /// Updates the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the batch as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
