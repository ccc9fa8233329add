//! `retrier config` – show where the config lives and what is in effect.

use anyhow::Result;
use retrier_core::config::{self, RetrierConfig};

pub fn run_config(cfg: &RetrierConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
