//! Reading and writing the preview config file
//!
//! A file that parses but fails [`Config::validate`] is rejected as a whole,
//! so a zero cache capacity or a coverage outside `(0, 1]` never reaches the
//! scheduler.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::Config;

const APP_DIR: &str = "asset-preview";
const FILE_NAME: &str = "config.toml";

/// Default config file, `config.toml` inside [`config_dir`]
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(FILE_NAME))
}

/// Per-user directory holding the preview config (~/.config/asset-preview)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join(APP_DIR))
}

/// Load and validate the config at `path`.
///
/// An absent file means "all defaults"; an unreadable, malformed or
/// out-of-range one is an error.
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    parse(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Parse TOML text, filling missing keys with defaults, then range-check it.
fn parse(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
    Ok(config)
}

/// Write `config` as TOML to `path`, creating its directory first
pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, contents).with_context(|| format!("Failed to write config file: {:?}", path))
}
