//! Retry loop: run an async attempt until success or policy says stop.

use std::future::Future;

use super::policy::{RetryDecision, RetryPolicy};
use crate::error::FileBoxError;

/// Runs `attempt` until it succeeds or the retry policy says to stop.
///
/// The closure receives the 1-based attempt number. On failure returns the
/// number of attempts made together with the last error.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, (u32, FileBoxError)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FileBoxError>>,
{
    let mut n = 1u32;
    loop {
        match attempt(n).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                match policy.decide(n, &e) {
                    RetryDecision::NoRetry => return Err((n, e)),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt = n, error = %e, "attempt failed, retrying");
                        if !d.is_zero() {
                            tokio::time::sleep(d).await;
                        }
                        n += 1;
                    }
                }
            }
        }
    }
}
