//! CLI command handlers, one per file.

mod completions;
mod config;
mod delays;
mod exec;

pub use completions::run_completions;
pub use config::run_config;
pub use delays::run_delays;
pub use exec::run_exec;
