//! Cooperative cancellation for fetch and geocode loops.
//!
//! A [`CancelToken`] is cloned into every unit of work. Calling
//! [`CancelToken::cancel`] on any clone wakes every task awaiting
//! [`CancelToken::cancelled`], which lets [`run_cancellable`] drop the
//! in-flight future (and with it any open HTTP request).

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Shared cancellation flag backed by a [`watch`] channel.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Cancels this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes when the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns once the
        // flag flips.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `fut` unless `cancel` fires first.
///
/// Returns `None` if the token was cancelled before or while `fut` ran; the
/// future is dropped in that case.
pub async fn run_cancellable<F>(cancel: &CancelToken, fut: F) -> Option<F::Output>
where
    F: Future,
{
    if cancel.is_cancelled() {
        return None;
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let cancel = CancelToken::new();
        assert_eq!(run_cancellable(&cancel, async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn already_cancelled_skips_future() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = run_cancellable(&cancel, async { 1 }).await;
        assert!(out.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_pending_future() {
        let cancel = CancelToken::new();
        let clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            clone.cancel();
        });
        let out = run_cancellable(&cancel, tokio::time::sleep(Duration::from_secs(3600))).await;
        assert!(out.is_none());
        assert!(cancel.is_cancelled());
    }
}
