//! Cooperative cancellation for in-flight loads.
//!
//! Each load runs under one token generation. Starting a new load does not
//! flip a shared flag back and forth; it *replaces* the token via
//! [`CancellationToken::reset`], cancelling the old generation and handing
//! out a fresh one. A stale token can therefore never be resurrected, and
//! work holding it keeps observing `is_cancelled() == true` forever.
//!
//! The loading pipeline re-checks `is_cancelled` immediately after every
//! suspension point before mutating shared state; [`wrap`] additionally
//! races a future against cancellation so long-blocking awaits settle
//! promptly.
//!
//! [`wrap`]: CancellationToken::wrap

use crate::error::{PlayerError, Result};
use std::future::Future;

/// Generation-stamped cancellation token.
///
/// Clones share the same generation: cancelling any clone cancels them all.
/// `reset` is the only way to obtain the next generation.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: tokio_util::sync::CancellationToken,
    generation: u64,
}

impl CancellationToken {
    /// First-generation token.
    pub fn new() -> Self {
        Self {
            inner: tokio_util::sync::CancellationToken::new(),
            generation: 0,
        }
    }

    /// Cancel this generation. Idempotent and immediately observable.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Whether this generation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Generation number, for diagnostics and staleness assertions.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel this generation and return the next one.
    ///
    /// Callers must replace their held reference with the returned token;
    /// the old token stays cancelled forever.
    #[must_use = "the returned token is the new generation; dropping it leaves only cancelled tokens"]
    pub fn reset(&self) -> Self {
        self.inner.cancel();
        Self {
            inner: tokio_util::sync::CancellationToken::new(),
            generation: self.generation + 1,
        }
    }

    /// Resolve when this generation is cancelled.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await;
    }

    /// Race `future` against cancellation.
    ///
    /// Returns `Err(Aborted)` if cancellation occurs before or during the
    /// wrapped operation, the original outcome otherwise. The cancellation
    /// waiter is dropped on settlement either way, so no registration leaks.
    pub async fn wrap<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(PlayerError::Aborted);
        }
        tokio::select! {
            _ = self.inner.cancelled() => Err(PlayerError::Aborted),
            outcome = future => {
                // The operation may have completed concurrently with a
                // reset; a cancelled generation must not report success.
                if self.is_cancelled() {
                    Err(PlayerError::Aborted)
                } else {
                    outcome
                }
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_idempotent_and_observable() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_a_generation() {
        let token = CancellationToken::new();
        let clone = token.clone();

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn reset_bumps_generation_and_kills_the_old_one() {
        let first = CancellationToken::new();
        let second = first.reset();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(second.generation(), first.generation() + 1);

        // Cancelling the stale generation again must not touch the new one.
        first.cancel();
        assert!(!second.is_cancelled());
    }

    #[tokio::test]
    async fn wrap_passes_through_on_success() {
        let token = CancellationToken::new();
        let value = token.wrap(async { Ok(41 + 1) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn wrap_rejects_immediately_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let result = token.wrap(async { Ok(1) }).await;
        assert!(matches!(result, Err(PlayerError::Aborted)));
    }

    #[tokio::test]
    async fn wrap_aborts_a_pending_future() {
        let token = CancellationToken::new();
        let racer = token.clone();

        let handle = tokio::spawn(async move {
            racer
                .wrap(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(PlayerError::Aborted)));
    }
}
