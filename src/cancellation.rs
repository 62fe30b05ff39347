//! Provides a token-based mechanism for cancelling a compile.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A token that can be used to signal cancellation to long-running operations.
///
/// This struct is a cloneable, thread-safe handle. Synchronous code can poll
/// [`is_cancelled`](Self::is_cancelled); async code can await
/// [`cancelled`](Self::cancelled) inside a `tokio::select!`.
///
/// # Examples
///
/// ```
/// use papersync::CancellationToken;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let token = CancellationToken::new();
/// let token_clone = token.clone();
///
/// let handle = tokio::spawn(async move {
///     tokio::select! {
///         _ = token_clone.cancelled() => "cancelled",
///         _ = tokio::time::sleep(Duration::from_secs(60)) => "finished",
///     }
/// });
///
/// token.cancel();
/// assert_eq!(handle.await.unwrap(), "cancelled");
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a new `CancellationToken` in a non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation.
    ///
    /// All subsequent calls to `is_cancelled()` on this token or any of its
    /// clones return `true`, and every pending `cancelled()` future completes.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Checks if the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel() is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancelled() did not resolve")
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_resolves_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("cancelled() should be ready");
    }
}
