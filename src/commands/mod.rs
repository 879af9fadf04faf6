//! Command handlers for the asset-preview CLI.
//!
//! Each submodule handles a specific CLI command or command group.
//! The main dispatch logic remains in main.rs.

pub mod config;
pub mod demo;

use anyhow::Result;
use std::path::{Path, PathBuf};

use asset_preview::Config;

/// Config file to use: the `--config` override or the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_path(),
    }
}

/// Load the effective configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    Config::load_from(&resolve_config_path(explicit)?)
}
