//! asset-preview - CLI entry point

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::Level;

use cli::{Cli, Commands, ConfigCommands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Demo {
            videos,
            images,
            duration,
            frame_delay_ms,
            width,
            height,
        } => commands::demo::handle(
            config_path,
            &commands::demo::DemoArgs {
                videos,
                images,
                duration,
                frame_delay_ms,
                width,
                height,
            },
        ),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::handle_show(config_path),
            ConfigCommands::Path => commands::config::handle_path(config_path),
            ConfigCommands::Init => commands::config::handle_init(config_path),
        },
    }
}

/// Route tracing output to stderr so command output stays clean.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
