//! Attempt records and observer hooks for the retry loop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Rendered error of the failed attempt.
    Failed(String),
}

/// One attempt of one `execute` call. Records are built by the loop and
/// handed to the observer; the loop keeps no history of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based attempt index.
    pub index: u32,
    /// Delay slept immediately before this attempt (zero for the first).
    pub delay_before: Duration,
    pub outcome: Outcome,
}

impl AttemptRecord {
    pub fn succeeded(index: u32, delay_before: Duration) -> Self {
        Self {
            index,
            delay_before,
            outcome: Outcome::Succeeded,
        }
    }

    pub fn failed(index: u32, delay_before: Duration, error: impl ToString) -> Self {
        Self {
            index,
            delay_before,
            outcome: Outcome::Failed(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }
}

/// Why the loop stopped with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    NonRetryable,
    Exhausted,
}

/// Callbacks fired by the retry loop. A policy may be shared across threads,
/// so observers are too.
pub trait RetryObserver: Send + Sync {
    /// A retryable attempt failed and the loop will sleep `next_delay`.
    fn on_retry(&self, record: &AttemptRecord, next_delay: Duration);

    /// The attempt in `record` returned a value.
    fn on_success(&self, record: &AttemptRecord);

    /// The attempt in `record` failed and the loop is returning an error.
    fn on_give_up(&self, record: &AttemptRecord, reason: GiveUpReason);
}

impl<O: RetryObserver + ?Sized> RetryObserver for Arc<O> {
    fn on_retry(&self, record: &AttemptRecord, next_delay: Duration) {
        (**self).on_retry(record, next_delay);
    }

    fn on_success(&self, record: &AttemptRecord) {
        (**self).on_success(record);
    }

    fn on_give_up(&self, record: &AttemptRecord, reason: GiveUpReason) {
        (**self).on_give_up(record, reason);
    }
}

/// Logs attempts through `tracing`.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("operation")
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn error_text(record: &AttemptRecord) -> &str {
    match &record.outcome {
        Outcome::Failed(msg) => msg,
        Outcome::Succeeded => "",
    }
}

impl RetryObserver for TracingObserver {
    fn on_retry(&self, record: &AttemptRecord, next_delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = record.index,
            delay_ms = millis(next_delay),
            "attempt failed, retrying: {}",
            error_text(record)
        );
    }

    fn on_success(&self, record: &AttemptRecord) {
        if record.index > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt = record.index,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(operation = %self.operation, "succeeded on first attempt");
        }
    }

    fn on_give_up(&self, record: &AttemptRecord, reason: GiveUpReason) {
        match reason {
            GiveUpReason::NonRetryable => tracing::warn!(
                operation = %self.operation,
                attempt = record.index,
                "non-retryable failure: {}",
                error_text(record)
            ),
            GiveUpReason::Exhausted => tracing::error!(
                operation = %self.operation,
                attempts = record.index,
                "retries exhausted: {}",
                error_text(record)
            ),
        }
    }
}

/// Collects every attempt record. Share it with the policy through an `Arc`.
#[derive(Debug, Default)]
pub struct AttemptLog {
    records: Mutex<Vec<AttemptRecord>>,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AttemptRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AttemptRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RetryObserver for AttemptLog {
    fn on_retry(&self, record: &AttemptRecord, _next_delay: Duration) {
        self.lock().push(record.clone());
    }

    fn on_success(&self, record: &AttemptRecord) {
        self.lock().push(record.clone());
    }

    fn on_give_up(&self, record: &AttemptRecord, _reason: GiveUpReason) {
        self.lock().push(record.clone());
    }
}
