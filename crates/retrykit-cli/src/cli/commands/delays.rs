//! `retrykit delays` – print a strategy's delay schedule.

use retrykit_core::retry::RetryStrategy;
use std::time::Duration;

/// Lines of the schedule table: the attempt that failed and the wait after it.
pub fn schedule_lines(strategy: &RetryStrategy, count: usize) -> Vec<String> {
    strategy
        .delays()
        .take(count)
        .enumerate()
        .map(|(i, d)| format!("{:<8} {}", i + 1, format_delay(d)))
        .collect()
}

fn format_delay(d: Duration) -> String {
    if d.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:?}", d)
    }
}

pub fn run_delays(strategy: &RetryStrategy, count: usize) {
    let lines = schedule_lines(strategy, count);
    if lines.is_empty() {
        println!("No retries: a single attempt is made.");
        return;
    }
    println!("{:<8} {}", "AFTER", "DELAY");
    for line in lines {
        println!("{line}");
    }
    if strategy.is_unlimited() {
        println!("... (unlimited)");
    }
}
