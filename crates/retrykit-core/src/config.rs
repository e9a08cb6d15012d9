use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::retry::{Backoff, RetryStrategy};

/// Errors from turning config values into a strategy.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown backoff {0:?} (expected constant, linear or exponential)")]
    UnknownBackoff(String),
    #[error("invalid multiplier {0}: must be finite and >= 1.0")]
    InvalidMultiplier(f64),
    #[error("no retry profile named {0:?}")]
    UnknownProfile(String),
}

/// Shape of the delay function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Constant,
    Linear,
    #[default]
    Exponential,
}

impl FromStr for BackoffKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "constant" | "fixed" => Ok(BackoffKind::Constant),
            "linear" => Ok(BackoffKind::Linear),
            "exponential" | "exp" => Ok(BackoffKind::Exponential),
            _ => Err(ConfigError::UnknownBackoff(s.to_string())),
        }
    }
}

/// Retry strategy parameters (`[retry]` and `[profiles.<name>]` sections).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first). 0 = unlimited.
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    /// Constant delay, linear step, or exponential base, in milliseconds.
    pub delay_ms: u64,
    /// Growth factor for exponential backoff; ignored otherwise.
    pub multiplier: f64,
    /// Cap on any single delay, in milliseconds. 0 = uncapped.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffKind::Exponential,
            delay_ms: 250,
            multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Validate and build the strategy these values describe.
    pub fn to_strategy(&self) -> Result<RetryStrategy, ConfigError> {
        let delay = Duration::from_millis(self.delay_ms);
        let backoff = match self.backoff {
            BackoffKind::Constant => Backoff::Constant { delay },
            BackoffKind::Linear => Backoff::Linear { step: delay },
            BackoffKind::Exponential => {
                if !self.multiplier.is_finite() || self.multiplier < 1.0 {
                    return Err(ConfigError::InvalidMultiplier(self.multiplier));
                }
                Backoff::Exponential {
                    base: delay,
                    multiplier: self.multiplier,
                }
            }
        };
        Ok(RetryStrategy {
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
            backoff,
            max_delay: (self.max_delay_ms > 0)
                .then(|| Duration::from_millis(self.max_delay_ms)),
        })
    }
}

/// Global configuration loaded from `~/.config/retrykit/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrykitConfig {
    /// Strategy used when no profile is named.
    pub retry: RetryConfig,
    /// Named strategies, selected with `--profile`.
    pub profiles: BTreeMap<String, RetryConfig>,
}

impl RetrykitConfig {
    /// The default `[retry]` section, or the named profile.
    pub fn profile(&self, name: Option<&str>) -> Result<&RetryConfig, ConfigError> {
        match name {
            None => Ok(&self.retry),
            Some(n) => self
                .profiles
                .get(n)
                .ok_or_else(|| ConfigError::UnknownProfile(n.to_string())),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("retrykit")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Render a config as pretty TOML.
pub fn render(cfg: &RetrykitConfig) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RetrykitConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<RetrykitConfig> {
    if !path.exists() {
        let default_cfg = RetrykitConfig::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, render(&default_cfg)?)
            .with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RetrykitConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
