//! Deadline helper.
//!
//! The consumer imposes no timeout of its own. Callers that want one wrap the
//! wait with [`with_deadline`] and call `cancel()` when it fires.

use std::future::Future;
use std::time::Duration;

use crate::error::RunStreamError;

/// Resolve `future` or fail with [`RunStreamError::Timeout`] after `duration`.
///
/// ```no_run
/// # use std::time::Duration;
/// # use runstream::consumer::RunSubscription;
/// # use runstream::util::timeout::with_deadline;
/// # async fn example(run: RunSubscription) {
/// let outcome = with_deadline(Duration::from_secs(30), run.wait_terminal()).await;
/// match outcome {
///     Ok(Some(state)) => println!("finished: {}", state.phase),
///     Ok(None) => println!("canceled"),
///     Err(err) => println!("{err}"),
/// }
/// # }
/// ```
pub async fn with_deadline<T>(
    duration: Duration,
    future: impl Future<Output = T>,
) -> Result<T, RunStreamError> {
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| RunStreamError::Timeout(duration.as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_a_timeout() {
        let err = with_deadline(Duration::from_millis(50), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(matches!(err, RunStreamError::Timeout(50)));
    }

    #[tokio::test]
    async fn ready_future_passes_through() {
        let value = with_deadline(Duration::from_secs(1), async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }
}
