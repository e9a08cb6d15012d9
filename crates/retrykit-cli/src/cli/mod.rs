//! CLI for the retrykit retry engine.

mod commands;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use retrykit_core::config::{self, BackoffKind, RetrykitConfig};
use retrykit_core::retry::RetryStrategy;

use commands::{run_completions, run_config, run_delays, run_exec};

/// Top-level CLI for retrykit.
#[derive(Debug, Parser)]
#[command(name = "retrykit")]
#[command(about = "retrykit: run and inspect retry policies", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the delay slept before each retry.
    Delays {
        #[command(flatten)]
        strategy: StrategyArgs,

        /// Maximum number of delays to print (unlimited strategies never end).
        #[arg(long, default_value = "10", value_name = "N")]
        count: usize,
    },

    /// Run a command, retrying while it exits non-zero.
    Exec {
        #[command(flatten)]
        strategy: StrategyArgs,

        /// Only retry these exit codes (comma separated). Default: any non-zero code.
        #[arg(long, value_delimiter = ',', value_name = "CODES")]
        retry_on: Vec<i32>,

        /// Command and arguments.
        #[arg(trailing_var_arg = true, required = true, value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Show the config file path and effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        shell: Shell,
    },
}

/// Strategy selection: a config profile, then per-field overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct StrategyArgs {
    /// Named profile from config.toml (default: the [retry] section).
    #[arg(long)]
    pub profile: Option<String>,

    /// Maximum attempts including the first; 0 = unlimited.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// constant, linear or exponential.
    #[arg(long)]
    pub backoff: Option<BackoffKind>,

    /// Constant delay, linear step, or exponential base.
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Exponential growth factor.
    #[arg(long)]
    pub multiplier: Option<f64>,

    /// Cap on any single delay; 0 removes the cap.
    #[arg(long, value_name = "MS")]
    pub max_delay_ms: Option<u64>,
}

impl StrategyArgs {
    /// Start from the selected profile and apply flag overrides.
    pub fn resolve(&self, cfg: &RetrykitConfig) -> Result<RetryStrategy> {
        let mut rc = cfg.profile(self.profile.as_deref())?.clone();
        if let Some(n) = self.max_attempts {
            rc.max_attempts = n;
        }
        if let Some(b) = self.backoff {
            rc.backoff = b;
        }
        if let Some(d) = self.delay_ms {
            rc.delay_ms = d;
        }
        if let Some(m) = self.multiplier {
            rc.multiplier = m;
        }
        if let Some(cap) = self.max_delay_ms {
            rc.max_delay_ms = cap;
        }
        Ok(rc.to_strategy()?)
    }
}

impl CliCommand {
    /// Parse args, run the command, and return the process exit code.
    pub fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();

        if let CliCommand::Completions { shell } = cli.command {
            run_completions(shell, &mut Cli::command());
            return Ok(0);
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Delays { strategy, count } => {
                run_delays(&strategy.resolve(&cfg)?, count);
                Ok(0)
            }
            CliCommand::Exec {
                strategy,
                retry_on,
                command,
            } => run_exec(&strategy.resolve(&cfg)?, &retry_on, &command),
            CliCommand::Config => {
                run_config(&config::config_path()?, &cfg)?;
                Ok(0)
            }
            CliCommand::Completions { .. } => Ok(0),
        }
    }
}
