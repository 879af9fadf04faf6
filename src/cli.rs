//! CLI definitions for asset-preview
//!
//! Kept apart from main.rs so the command tree can be inspected on its own.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "asset-preview")]
#[command(about = "Schedule and cache previews for media that is expensive to decode")]
#[command(
    long_about = "asset-preview - preview request scheduler and result cache.

Previews (stills, degraded placeholders, progressive frames and full
animations) are generated through a frame decoder, deduplicated while in
flight, decoded one video at a time and cached in memory.

QUICK START:
    asset-preview demo                 Run a synthetic catalog through the scheduler
    asset-preview config show          Show the effective configuration"
)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use this config file instead of ~/.config/asset-preview/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate previews for a synthetic catalog
    #[command(long_about = "Generate previews for a synthetic catalog of clips and stills.

The catalog is first warmed through the caching front-end, then every
asset is requested again the way a grid view would. The second pass is
answered from cache.

EXAMPLES:
    asset-preview demo
    asset-preview demo --videos 6 --images 2 --duration 3.5
    asset-preview -v demo --frame-delay-ms 1")]
    Demo {
        /// Number of video clips in the catalog
        #[arg(long, default_value_t = 3)]
        videos: usize,
        /// Number of still images in the catalog
        #[arg(long, default_value_t = 2)]
        images: usize,
        /// Clip duration in seconds
        #[arg(long, default_value_t = 2.0)]
        duration: f64,
        /// Simulated decode time per frame in milliseconds
        #[arg(long, default_value_t = 2)]
        frame_delay_ms: u64,
        /// Preview width in pixels
        #[arg(long, default_value_t = 160)]
        width: u32,
        /// Preview height in pixels
        #[arg(long, default_value_t = 90)]
        height: u32,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration as TOML
    Show,
    /// Print the config file location
    Path,
    /// Write the default configuration if no config file exists
    Init,
}
