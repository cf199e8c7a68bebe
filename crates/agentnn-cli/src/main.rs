//! Agent-NN CLI - Operator tooling for the dispatcher
//!
//! Runs authorization queries, one-shot dispatches, and feedback against
//! the configured policy file.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentnn_dispatch::Config;

mod commands;

use commands::{authorize, config, dispatch, policy};

#[derive(Parser)]
#[command(name = "agentnn")]
#[command(author, version, about = "Agent-NN - authorization-gated learning dispatcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./agentnn.toml, then ~/.config/agentnn/agentnn.toml)
    #[arg(short, long, global = true, env = "AGENTNN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an actor may perform an action
    Authorize(authorize::AuthorizeArgs),

    /// Select the agent or team for a task
    Dispatch(dispatch::DispatchArgs),

    /// Record the reward observed for a selection
    Learn(dispatch::LearnArgs),

    /// Inspect the persisted policy
    #[command(subcommand)]
    Policy(policy::PolicyCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(Some(path.as_path()))?,
        None => Config::load()?,
    };

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Authorize(args) => authorize::run(&config, args).await,
        Commands::Dispatch(args) => dispatch::run_dispatch(&config, args).await,
        Commands::Learn(args) => dispatch::run_learn(&config, args).await,
        Commands::Policy(cmd) => policy::run(&config, cmd).await,
        Commands::Config(cmd) => config::run(&config, cmd).await,
    }
}

/// Log to stderr so command output on stdout stays machine-readable
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.log.level.as_str() };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("agentnn={level}").into());

    if config.log.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dispatch() {
        let cli = Cli::try_parse_from([
            "agentnn",
            "dispatch",
            "--task-type",
            "code_review",
            "--actor",
            "alice",
            "--role",
            "writer",
            "--candidates",
            "A,B,C",
        ])
        .unwrap();
        match cli.command {
            Commands::Dispatch(args) => {
                assert_eq!(args.candidates, vec!["A", "B", "C"]);
                assert_eq!(args.task_type, "code_review");
            }
            _ => panic!("expected dispatch"),
        }
    }

    #[test]
    fn test_parse_learn_negative_reward() {
        let cli = Cli::try_parse_from([
            "agentnn",
            "learn",
            "--task-type",
            "docker",
            "--agents",
            "a1,a2",
            "--reward",
            "-0.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Learn(args) => {
                assert_eq!(args.agents, vec!["a1", "a2"]);
                assert_eq!(args.reward, -0.5);
            }
            _ => panic!("expected learn"),
        }
    }
}
