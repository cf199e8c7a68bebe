//! Configuration management commands

use anyhow::Result;
use clap::Subcommand;

use agentnn_dispatch::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

pub async fn run(config: &Config, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config).await,
    }
}

async fn show(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
