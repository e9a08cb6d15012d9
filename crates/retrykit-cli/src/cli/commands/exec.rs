//! `retrykit exec -- CMD ARGS...` – run a command under a retry strategy.

use anyhow::{Context, Result};
use retrykit_core::retry::{
    AttemptRecord, GiveUpReason, Outcome, RetryObserver, RetryPolicy, RetryStrategy,
    TracingObserver,
};
use std::fmt;
use std::io;
use std::process::Command;
use std::time::Duration;

/// Failure of one run of the child command.
#[derive(Debug)]
pub enum ExecFailure {
    /// The command could not be started (not found, not executable). Not retried.
    Spawn(io::Error),
    /// The command ran and exited non-zero, or was killed by a signal (`None`).
    Exit(Option<i32>),
}

impl fmt::Display for ExecFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecFailure::Spawn(e) => write!(f, "spawn failed: {}", e),
            ExecFailure::Exit(Some(code)) => write!(f, "exit code {}", code),
            ExecFailure::Exit(None) => write!(f, "terminated by signal"),
        }
    }
}

impl std::error::Error for ExecFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecFailure::Spawn(e) => Some(e),
            ExecFailure::Exit(_) => None,
        }
    }
}

/// Whether a failure should be retried. An empty `retry_on` retries every
/// non-zero exit; otherwise only the listed codes are retried.
pub fn is_retryable(failure: &ExecFailure, retry_on: &[i32]) -> bool {
    match failure {
        ExecFailure::Spawn(_) => false,
        ExecFailure::Exit(code) => {
            retry_on.is_empty() || code.is_some_and(|c| retry_on.contains(&c))
        }
    }
}

/// Tells the user about each retry on stderr and logs through `tracing`.
struct StderrObserver {
    log: TracingObserver,
}

impl RetryObserver for StderrObserver {
    fn on_retry(&self, record: &AttemptRecord, next_delay: Duration) {
        if let Outcome::Failed(msg) = &record.outcome {
            eprintln!(
                "retrykit: attempt {} failed ({}); retrying in {:?}",
                record.index, msg, next_delay
            );
        }
        self.log.on_retry(record, next_delay);
    }

    fn on_success(&self, record: &AttemptRecord) {
        self.log.on_success(record);
    }

    fn on_give_up(&self, record: &AttemptRecord, reason: GiveUpReason) {
        if reason == GiveUpReason::Exhausted {
            eprintln!("retrykit: giving up after {} attempts", record.index);
        }
        self.log.on_give_up(record, reason);
    }
}

fn run_once(program: &str, args: &[String]) -> Result<(), ExecFailure> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(ExecFailure::Spawn)?;
    if status.success() {
        Ok(())
    } else {
        Err(ExecFailure::Exit(status.code()))
    }
}

/// Run `command` until it exits 0 or the policy gives up. Returns the exit
/// code to propagate: 0 on success, the child's last code otherwise (1 when
/// it was killed by a signal).
pub fn run_exec(strategy: &RetryStrategy, retry_on: &[i32], command: &[String]) -> Result<i32> {
    let (program, args) = command
        .split_first()
        .context("exec requires a command to run")?;

    let policy = RetryPolicy::new(*strategy)
        .retry_if(|f: &ExecFailure| is_retryable(f, retry_on))
        .with_observer(StderrObserver {
            log: TracingObserver::new(program.clone()),
        });

    match policy.execute(|| run_once(program, args)) {
        Ok(()) => Ok(0),
        Err(err) => match err.into_inner() {
            ExecFailure::Spawn(e) => Err(e).with_context(|| format!("failed to run {}", program)),
            ExecFailure::Exit(code) => Ok(code.unwrap_or(1)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    fn quick(max: u32) -> RetryStrategy {
        RetryStrategy::constant(max, Duration::ZERO)
    }

    #[test]
    fn retry_on_filter() {
        assert!(is_retryable(&ExecFailure::Exit(Some(3)), &[]));
        assert!(is_retryable(&ExecFailure::Exit(Some(75)), &[75, 111]));
        assert!(!is_retryable(&ExecFailure::Exit(Some(2)), &[75, 111]));
        assert!(!is_retryable(&ExecFailure::Exit(None), &[75]));
        let spawn = ExecFailure::Spawn(io::Error::new(io::ErrorKind::NotFound, "nope"));
        assert!(!is_retryable(&spawn, &[]));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_runs_max_attempts_and_returns_its_code() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let script = format!("echo x >> '{}'; exit 3", counter.display());
        let code = run_exec(&quick(4), &[], &sh(&script)).unwrap();
        assert_eq!(code, 3);
        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn command_succeeding_on_third_run_stops_there() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let script = format!(
            "echo x >> '{0}'; [ $(wc -l < '{0}') -ge 3 ]",
            counter.display()
        );
        let code = run_exec(&quick(5), &[], &sh(&script)).unwrap();
        assert_eq!(code, 0);
        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn unlisted_exit_code_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("runs");
        let script = format!("echo x >> '{}'; exit 2", counter.display());
        let code = run_exec(&quick(5), &[75], &sh(&script)).unwrap();
        assert_eq!(code, 2);
        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 1);
    }

    #[test]
    fn missing_program_is_an_error_not_a_retry() {
        let cmd = vec!["retrykit-definitely-not-a-real-binary".to_string()];
        let err = run_exec(&quick(5), &[], &cmd).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to run"));
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(run_exec(&quick(1), &[], &[]).is_err());
    }
}
