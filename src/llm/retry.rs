//! Exponential backoff retry for provider requests.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::debug;

const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// Retry an async operation with exponential backoff (base 1s, max 30s).
///
/// `attempt` runs at most `max_attempts` times (at least once). Errors for
/// which `should_retry` returns false are returned immediately. When every
/// attempt fails, `wrap_exhausted` receives the attempt count and last error.
pub async fn retry_with_backoff<T, E, Fut, F, R, W>(
    max_attempts: u32,
    mut attempt: F,
    should_retry: R,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    W: FnOnce(u32, E) -> E,
{
    let max_attempts = max_attempts.max(1);
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempts = 0;
    loop {
        attempts += 1;

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) if attempts >= max_attempts => return Err(wrap_exhausted(attempts, e)),
            Err(_) => {
                if let Some(wait) = backoff.next_backoff() {
                    debug!("Attempt {} failed, retrying in {:?}", attempts, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
