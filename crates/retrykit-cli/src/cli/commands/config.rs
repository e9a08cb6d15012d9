//! `retrykit config` – show where the config lives and what it resolves to.

use anyhow::Result;
use retrykit_core::config::{self, RetrykitConfig};
use std::path::Path;

pub fn run_config(path: &Path, cfg: &RetrykitConfig) -> Result<()> {
    println!("# {}", path.display());
    print!("{}", config::render(cfg)?);
    Ok(())
}
