//! Error returned when a retried operation does not succeed.

use thiserror::Error;

/// Why the retry loop stopped without a value. Both variants carry the
/// underlying error from the last attempt.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The predicate rejected the error; no further attempts were made.
    #[error("non-retryable failure on attempt {attempt}: {source}")]
    NonRetryable {
        attempt: u32,
        #[source]
        source: E,
    },
    /// The strategy's attempt budget ran out.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made, including the failing one.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::NonRetryable { attempt, .. } => *attempt,
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    pub fn is_non_retryable(&self) -> bool {
        matches!(self, RetryError::NonRetryable { .. })
    }

    /// The last underlying error.
    pub fn inner(&self) -> &E {
        match self {
            RetryError::NonRetryable { source, .. } | RetryError::Exhausted { source, .. } => {
                source
            }
        }
    }

    /// Drop the retry annotation and return the last underlying error.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::NonRetryable { source, .. } | RetryError::Exhausted { source, .. } => {
                source
            }
        }
    }
}
