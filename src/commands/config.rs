//! Config subcommands handler

use anyhow::Result;
use std::path::Path;

use asset_preview::Config;

use super::{load_config, resolve_config_path};

/// Show the effective configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Print where the config file is read from.
#[cfg(not(tarpaulin_include))]
pub fn handle_path(explicit: Option<&Path>) -> Result<()> {
    println!("{}", resolve_config_path(explicit)?.display());
    Ok(())
}

/// Write the default configuration unless a file already exists.
#[cfg(not(tarpaulin_include))]
pub fn handle_init(explicit: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(explicit)?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    Config::default().save_to(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
