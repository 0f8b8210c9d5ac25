//! Cooperative cancellation helpers.
//!
//! One `CancellationToken` is created per run and threaded through every
//! suspension point: before each network call, during each cooldown sleep, and
//! before each batch item.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Sleep that wakes early when cancellation is requested.
///
/// Returns `true` if the full duration elapsed, `false` if the sleep was
/// interrupted.
pub async fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes_without_cancellation() {
        let cancel = CancellationToken::new();
        assert!(sleep_unless_cancelled(Duration::from_millis(10), &cancel).await);
    }

    #[tokio::test]
    async fn test_sleep_aborts_on_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!sleep_unless_cancelled(Duration::from_secs(3600), &cancel).await);
    }
}
