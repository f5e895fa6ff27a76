//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chirp_core::config;
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "chirp")]
#[command(version)]
#[command(about = "Terminal client for a live social feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Read configuration from this file instead of ${CHIRP_HOME}/config.toml
    #[arg(long, value_name = "PATH", env = "CHIRP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Open the feed in the terminal (default)
    Feed,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // config commands never touch the network
    if let Some(Commands::Config { command }) = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path(cli.config.as_deref());
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(cli.config.as_deref()),
        };
    }

    let config = match cli.config.as_deref() {
        Some(path) => config::Config::load_from(path),
        None => config::Config::load(),
    }
    .context("load config")?;

    // one tokio runtime for everything; the terminal loop itself stays on
    // this thread
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    let _enter = rt.enter();
    commands::feed::run(&config)
}
