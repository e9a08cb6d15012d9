//! Classify errors into retryable and non-retryable.

use std::io;

/// Decides whether a failed attempt may be retried.
pub trait RetryPredicate<E: ?Sized> {
    fn should_retry(&self, error: &E) -> bool;
}

/// Every error is retryable. The default predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// No error is retryable; the policy degenerates to a single call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _error: &E) -> bool {
        false
    }
}

/// Predicate backed by a closure.
#[derive(Clone, Copy)]
pub struct FnPredicate<F>(pub F);

impl<E, F> RetryPredicate<E> for FnPredicate<F>
where
    E: ?Sized,
    F: Fn(&E) -> bool,
{
    fn should_retry(&self, error: &E) -> bool {
        (self.0)(error)
    }
}

/// Errors that know whether they are transient.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Predicate that defers to the error's own [`Retryable`] impl.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByKind;

impl<E: Retryable + ?Sized> RetryPredicate<E> for ByKind {
    fn should_retry(&self, error: &E) -> bool {
        error.is_retryable()
    }
}

impl Retryable for io::Error {
    fn is_retryable(&self) -> bool {
        classify_io_error(self)
    }
}

/// Classify an IO error: timeouts, interrupts and dropped connections are
/// transient; missing files, permissions and bad input are not.
pub fn classify_io_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_err(kind: io::ErrorKind) -> io::Error {
        io::Error::new(kind, "test")
    }

    #[test]
    fn always_and_never() {
        assert!(AlwaysRetry.should_retry("boom"));
        assert!(!NeverRetry.should_retry("boom"));
    }

    #[test]
    fn closure_predicate() {
        let p = FnPredicate(|code: &i32| *code >= 500);
        assert!(p.should_retry(&503));
        assert!(!p.should_retry(&404));
    }

    #[test]
    fn io_transient_kinds_retryable() {
        assert!(ByKind.should_retry(&io_err(io::ErrorKind::TimedOut)));
        assert!(ByKind.should_retry(&io_err(io::ErrorKind::ConnectionReset)));
        assert!(ByKind.should_retry(&io_err(io::ErrorKind::Interrupted)));
    }

    #[test]
    fn io_permanent_kinds_not_retryable() {
        assert!(!ByKind.should_retry(&io_err(io::ErrorKind::NotFound)));
        assert!(!ByKind.should_retry(&io_err(io::ErrorKind::PermissionDenied)));
        assert!(!ByKind.should_retry(&io_err(io::ErrorKind::InvalidInput)));
    }
}
