use std::time::Duration;

use crate::error::FileBoxError;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay (zero = immediately).
    RetryAfter(Duration),
}

/// Fixed attempt budget with optional exponential backoff.
///
/// With `base_delay` zero (the default) every retry is immediate, so the
/// policy reduces to "try each chunk up to `max_attempts` times".
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after attempt number `attempt` (1-based) failed with `err`.
    pub fn decide(&self, attempt: u32, err: &FileBoxError) -> RetryDecision {
        if err.is_cancelled() || attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        // base * 2^(attempt-1), capped.
        let exp = 1u32 << attempt.saturating_sub(1).min(8);
        let raw = self.base_delay.saturating_mul(exp);
        RetryDecision::RetryAfter(raw.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unavailable() -> FileBoxError {
        FileBoxError::InvalidChunkResponse {
            status: 503,
            content_length: Some(0),
        }
    }

    fn retry_delay(d: RetryDecision) -> Duration {
        match d {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::NoRetry => panic!("expected retry"),
        }
    }

    #[test]
    fn cancelled_is_never_retried() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, &FileBoxError::Cancelled), RetryDecision::NoRetry);
        let wrapped = FileBoxError::ChunkDownloadFailed {
            index: 0,
            attempts: 1,
            source: Box::new(FileBoxError::Cancelled),
        };
        assert_eq!(p.decide(1, &wrapped), RetryDecision::NoRetry);
    }

    #[test]
    fn any_other_failure_is_retried_alike() {
        let p = RetryPolicy::default();
        let failures = [
            unavailable(),
            FileBoxError::Http {
                status: 404,
                url: "u".into(),
            },
            FileBoxError::RequestTimeout(Duration::from_secs(1)),
            FileBoxError::IncompleteBody {
                expected: 10,
                received: 4,
            },
        ];
        for e in &failures {
            assert_eq!(p.decide(1, e), RetryDecision::RetryAfter(Duration::ZERO), "{e}");
        }
    }

    #[test]
    fn default_stops_after_three_attempts() {
        let p = RetryPolicy::default();
        assert_eq!(
            p.decide(2, &unavailable()),
            RetryDecision::RetryAfter(Duration::ZERO)
        );
        assert_eq!(p.decide(3, &unavailable()), RetryDecision::NoRetry);
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let p = RetryPolicy {
            max_attempts: 20,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(retry_delay(p.decide(1, &unavailable())), Duration::from_millis(250));
        assert_eq!(retry_delay(p.decide(2, &unavailable())), Duration::from_millis(500));
        assert_eq!(retry_delay(p.decide(10, &unavailable())), p.max_delay);
    }
}
