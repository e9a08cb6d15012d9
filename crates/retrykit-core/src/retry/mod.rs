//! Retry and backoff policy.
//!
//! This module encapsulates retry strategies (constant, linear and
//! exponential backoff, bounded or unlimited), retryability predicates and a
//! blocking retry loop so that callers share one consistent policy.

mod error;
mod observe;
mod predicate;
mod run;
mod sleep;
mod strategy;

pub use error::RetryError;
pub use observe::{AttemptLog, AttemptRecord, GiveUpReason, Outcome, RetryObserver, TracingObserver};
pub use predicate::{
    classify_io_error, AlwaysRetry, ByKind, FnPredicate, NeverRetry, RetryPredicate, Retryable,
};
pub use run::{execute, RetryPolicy};
pub use sleep::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use strategy::{Backoff, Delays, RetryDecision, RetryStrategy};
