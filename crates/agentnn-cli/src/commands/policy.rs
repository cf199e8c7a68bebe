//! Policy inspection commands

use anyhow::{Context, Result};
use clap::Subcommand;

use agentnn_dispatch::{Config, SelectionMode};
use agentnn_rl::store::render_policy;
use agentnn_rl::{AgentId, PolicyStore, Team};

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Print every learned entry
    Show,
    /// Print the configured policy location
    Path,
}

pub async fn run(config: &Config, cmd: PolicyCommands) -> Result<()> {
    match cmd {
        PolicyCommands::Show => show(config).await,
        PolicyCommands::Path => path(config).await,
    }
}

fn store(config: &Config) -> Result<PolicyStore> {
    config
        .policy
        .path
        .as_ref()
        .map(PolicyStore::new)
        .context("policy.path is not configured")
}

async fn show(config: &Config) -> Result<()> {
    let store = store(config)?;
    if !store.exists() {
        println!("No policy stored at {}", store.path().display());
        return Ok(());
    }

    let (rendered, count) = match config.learning.mode {
        SelectionMode::Single => {
            let table = store.load::<AgentId>()?;
            (render_policy(&table)?, table.len())
        }
        SelectionMode::Team => {
            let table = store.load::<Team>()?;
            (render_policy(&table)?, table.len())
        }
    };

    print!("{rendered}");
    println!("{count} entries ({})", store.path().display());
    Ok(())
}

async fn path(config: &Config) -> Result<()> {
    let store = store(config)?;
    println!("{}", store.path().display());
    Ok(())
}
