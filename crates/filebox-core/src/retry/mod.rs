//! Retry and backoff policy.
//!
//! Decides whether and when a failed chunk is attempted again. Every failure
//! except cancellation is retried while attempts remain. The default is a
//! fixed attempt count with no delay.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy};
pub use run::run_with_retry;
