use std::time::Duration;

/// Delay function mapping a failed attempt to the wait before the next one.
///
/// `attempt` is 1-based and names the attempt that just failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay after every failure.
    Constant { delay: Duration },
    /// `step * attempt`.
    Linear { step: Duration },
    /// `base * multiplier^(attempt - 1)`.
    Exponential { base: Duration, multiplier: f64 },
}

impl Backoff {
    /// Uncapped delay after `attempt` failed. Overflow saturates at the
    /// largest representable delay rather than wrapping.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            Backoff::Constant { delay } => delay,
            Backoff::Linear { step } => step.saturating_mul(attempt),
            Backoff::Exponential { base, multiplier } => {
                let exp = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                scale(base, multiplier.powi(exp))
            }
        }
    }
}

/// Multiply a duration by a float factor in nanosecond space, clamped to
/// `[0, u64::MAX ns]`.
fn scale(base: Duration, factor: f64) -> Duration {
    let nanos = (base.as_nanos() as f64 * factor).round();
    if nanos.is_nan() || nanos <= 0.0 {
        Duration::ZERO
    } else if nanos >= u64::MAX as f64 {
        Duration::from_nanos(u64::MAX)
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

/// Decision returned by the strategy after a retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempt budget is spent.
    GiveUp,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Attempt budget plus backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryStrategy {
    /// Maximum number of attempts (including the first). `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Delay function.
    pub backoff: Backoff,
    /// Upper bound on any single delay.
    pub max_delay: Option<Duration>,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: Some(5),
            backoff: Backoff::Exponential {
                base: Duration::from_millis(250),
                multiplier: 2.0,
            },
            max_delay: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryStrategy {
    /// Fixed attempt count with the same delay between attempts.
    /// `max_attempts` below 1 is normalized to a single attempt.
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self::bounded(max_attempts, Backoff::Constant { delay })
    }

    /// Fixed attempt count with delay `step * attempt`.
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self::bounded(max_attempts, Backoff::Linear { step })
    }

    /// Fixed attempt count with delay `base * multiplier^(attempt - 1)`.
    pub fn exponential(max_attempts: u32, base: Duration, multiplier: f64) -> Self {
        Self::bounded(max_attempts, Backoff::Exponential { base, multiplier })
    }

    /// Retry until success or a non-retryable error. Has no built-in
    /// timeout; callers bound it externally. Attempt indices stop growing
    /// at `u32::MAX`.
    pub fn unlimited(backoff: Backoff) -> Self {
        Self {
            max_attempts: None,
            backoff,
            max_delay: None,
        }
    }

    fn bounded(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            backoff,
            max_delay: None,
        }
    }

    /// Cap every computed delay at `max_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_attempts.is_none()
    }

    /// Delay after `attempt` failed, with the cap applied.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.backoff.delay_for(attempt);
        match self.max_delay {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }

    /// Decide what happens after a retryable failure of `attempt` (1-based).
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return RetryDecision::GiveUp;
            }
        }
        RetryDecision::RetryAfter(self.delay_for(attempt))
    }

    /// Delays slept before each retry, in order. Finite for bounded
    /// strategies (`max_attempts - 1` items), endless otherwise.
    pub fn delays(&self) -> Delays {
        Delays {
            strategy: *self,
            attempt: 1,
        }
    }
}

/// Iterator over a strategy's delay schedule. See [`RetryStrategy::delays`].
#[derive(Debug, Clone)]
pub struct Delays {
    strategy: RetryStrategy,
    attempt: u32,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        match self.strategy.decide(self.attempt) {
            RetryDecision::GiveUp => None,
            RetryDecision::RetryAfter(d) => {
                self.attempt = self.attempt.saturating_add(1);
                Some(d)
            }
        }
    }
}
