//! Retry loop: run a closure until success or the strategy says stop.

use std::fmt;
use std::time::Duration;

use super::error::RetryError;
use super::observe::{AttemptRecord, GiveUpReason, RetryObserver, TracingObserver};
use super::predicate::{AlwaysRetry, FnPredicate, RetryPredicate};
use super::sleep::{Sleeper, ThreadSleeper};
use super::strategy::{RetryDecision, RetryStrategy};

/// A strategy plus the predicate that decides which errors it applies to.
///
/// The policy holds no per-call state: every `execute` call owns its own
/// attempt counter, so one policy can serve many callers.
pub struct RetryPolicy<P = AlwaysRetry> {
    strategy: RetryStrategy,
    predicate: P,
    sleeper: Box<dyn Sleeper>,
    observer: Box<dyn RetryObserver>,
}

impl RetryPolicy<AlwaysRetry> {
    /// Policy that retries every error, sleeping on the calling thread and
    /// logging through `tracing`.
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            predicate: AlwaysRetry,
            sleeper: Box::new(ThreadSleeper),
            observer: Box::new(TracingObserver::default()),
        }
    }
}

impl<P> RetryPolicy<P> {
    /// Replace the retryability predicate.
    pub fn with_predicate<Q>(self, predicate: Q) -> RetryPolicy<Q> {
        RetryPolicy {
            strategy: self.strategy,
            predicate,
            sleeper: self.sleeper,
            observer: self.observer,
        }
    }

    /// Retry only errors for which `f` returns true.
    pub fn retry_if<F>(self, f: F) -> RetryPolicy<FnPredicate<F>> {
        self.with_predicate(FnPredicate(f))
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn with_observer(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    pub fn execute<T, E, F>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        P: RetryPredicate<E>,
        E: fmt::Display,
    {
        self.execute_with_attempt(|_| op())
    }

    /// Like [`execute`](Self::execute), but `op` receives the 1-based
    /// attempt index. Under an unlimited strategy the index stops at
    /// `u32::MAX` and repeats from there on.
    pub fn execute_with_attempt<T, E, F>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: RetryPredicate<E>,
        E: fmt::Display,
    {
        let mut attempt = 1u32;
        let mut delay_before = Duration::ZERO;
        loop {
            match op(attempt) {
                Ok(value) => {
                    self.observer
                        .on_success(&AttemptRecord::succeeded(attempt, delay_before));
                    return Ok(value);
                }
                Err(e) => {
                    let record = AttemptRecord::failed(attempt, delay_before, &e);
                    if !self.predicate.should_retry(&e) {
                        self.observer
                            .on_give_up(&record, GiveUpReason::NonRetryable);
                        return Err(RetryError::NonRetryable { attempt, source: e });
                    }
                    match self.strategy.decide(attempt) {
                        RetryDecision::GiveUp => {
                            self.observer.on_give_up(&record, GiveUpReason::Exhausted);
                            return Err(RetryError::Exhausted {
                                attempts: attempt,
                                source: e,
                            });
                        }
                        RetryDecision::RetryAfter(d) => {
                            self.observer.on_retry(&record, d);
                            if !d.is_zero() {
                                self.sleeper.sleep(d);
                            }
                            delay_before = d;
                            attempt = next_attempt(attempt);
                        }
                    }
                }
            }
        }
    }
}

/// Attempt counter step; pins at `u32::MAX` instead of wrapping to 0.
fn next_attempt(attempt: u32) -> u32 {
    attempt.saturating_add(1)
}

impl<P: fmt::Debug> fmt::Debug for RetryPolicy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("strategy", &self.strategy)
            .field("predicate", &self.predicate)
            .finish_non_exhaustive()
    }
}

/// Run `op` under `strategy`, retrying every error.
pub fn execute<T, E, F>(strategy: &RetryStrategy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    E: fmt::Display,
{
    RetryPolicy::new(*strategy).execute(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::observe::{AttemptLog, Outcome};
    use crate::retry::predicate::NeverRetry;
    use crate::retry::sleep::RecordingSleeper;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fails_twice_then_returns_42() {
        let calls = Cell::new(0);
        let result = execute(&RetryStrategy::constant(3, Duration::ZERO), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("transient")
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn always_failing_exhausts_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = execute(&RetryStrategy::constant(2, Duration::ZERO), || {
            calls.set(calls.get() + 1);
            Err("retryable")
        });
        let err = result.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn non_retryable_short_circuits() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(RetryStrategy::constant(10, Duration::ZERO))
            .with_predicate(NeverRetry);
        let result: Result<(), _> = policy.execute(|| {
            calls.set(calls.get() + 1);
            Err("fatal")
        });
        let err = result.unwrap_err();
        assert!(err.is_non_retryable());
        assert_eq!(err.into_inner(), "fatal");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn predicate_sees_each_error() {
        let policy = RetryPolicy::new(RetryStrategy::constant(10, Duration::ZERO))
            .retry_if(|code: &u32| *code != 404);
        let codes: [u32; 4] = [503, 502, 404, 500];
        let result: Result<(), _> = policy.execute_with_attempt(|n| Err(codes[n as usize - 1]));
        let err = result.unwrap_err();
        assert!(err.is_non_retryable());
        assert_eq!(err.attempts(), 3);
        assert_eq!(*err.inner(), 404);
    }

    #[test]
    fn single_attempt_never_sleeps() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let policy = RetryPolicy::new(RetryStrategy::constant(1, ms(100)))
            .with_sleeper(Arc::clone(&sleeper));
        let result: Result<(), _> = policy.execute(|| Err("nope"));
        assert_eq!(result.unwrap_err().attempts(), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn sleeps_follow_exponential_schedule() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let policy = RetryPolicy::new(RetryStrategy::exponential(4, ms(10), 2.0))
            .with_sleeper(Arc::clone(&sleeper));
        let result: Result<(), _> = policy.execute(|| Err("down"));
        assert!(result.unwrap_err().is_exhausted());
        assert_eq!(sleeper.slept(), vec![ms(10), ms(20), ms(40)]);
    }

    #[test]
    fn zero_delay_skips_sleeper() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let policy = RetryPolicy::new(RetryStrategy::constant(3, Duration::ZERO))
            .with_sleeper(Arc::clone(&sleeper));
        let _: Result<(), _> = policy.execute(|| Err("x"));
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn attempt_indices_start_at_one_and_increase() {
        let log = Arc::new(AttemptLog::new());
        let policy = RetryPolicy::new(RetryStrategy::linear(5, ms(1)))
            .with_sleeper(RecordingSleeper::new())
            .with_observer(Arc::clone(&log));
        let result = policy.execute_with_attempt(|n| if n == 3 { Ok(n) } else { Err("again") });
        assert_eq!(result.unwrap(), 3);

        let records = log.records();
        let indices: Vec<u32> = records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(records[0].delay_before, Duration::ZERO);
        assert_eq!(records[1].delay_before, ms(1));
        assert_eq!(records[2].delay_before, ms(2));
        assert_eq!(records[0].outcome, Outcome::Failed("again".to_string()));
        assert!(records[2].is_success());
    }

    #[test]
    fn unlimited_keeps_going_until_success() {
        let calls = Cell::new(0u32);
        let strategy = RetryStrategy::unlimited(crate::retry::Backoff::Constant {
            delay: Duration::ZERO,
        });
        let result = execute(&strategy, || {
            calls.set(calls.get() + 1);
            if calls.get() == 250 {
                Ok("done")
            } else {
                Err("not yet")
            }
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 250);
    }

    #[test]
    fn attempt_counter_pins_at_max() {
        assert_eq!(next_attempt(1), 2);
        assert_eq!(next_attempt(u32::MAX - 1), u32::MAX);
        assert_eq!(next_attempt(u32::MAX), u32::MAX);
    }

    #[test]
    fn one_policy_serves_several_threads() {
        let log = Arc::new(AttemptLog::new());
        let policy = Arc::new(
            RetryPolicy::new(RetryStrategy::constant(3, ms(5)))
                .with_sleeper(RecordingSleeper::new())
                .with_observer(Arc::clone(&log)),
        );
        let calls = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let policy = Arc::clone(&policy);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    policy.execute_with_attempt(|n| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if n == 2 {
                            Ok(n)
                        } else {
                            Err("busy")
                        }
                    })
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(log.records().len(), 4);
    }
}
