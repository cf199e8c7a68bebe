//! One-shot dispatch and feedback against the configured policy

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::debug;

use agentnn_core::TaskContext;
use agentnn_dispatch::{Config, DispatchService, SelectionMode};
use agentnn_rl::{Selection, Team};

#[derive(Args)]
pub struct DispatchArgs {
    /// Task type label
    #[arg(long)]
    pub task_type: String,

    /// Actor submitting the task
    #[arg(long)]
    pub actor: String,

    /// Role the actor is acting under
    #[arg(long)]
    pub role: String,

    /// Candidate agents, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub candidates: Vec<String>,

    /// Optional task title
    #[arg(long)]
    pub title: Option<String>,

    /// Print the selection as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct LearnArgs {
    /// Task type label
    #[arg(long)]
    pub task_type: String,

    /// Selected agent, or comma-separated team
    #[arg(long, value_delimiter = ',', required = true)]
    pub agents: Vec<String>,

    /// Observed reward
    #[arg(long, allow_negative_numbers = true)]
    pub reward: f64,
}

pub async fn run_dispatch(config: &Config, args: DispatchArgs) -> Result<()> {
    let service = DispatchService::from_config(config)?;

    let mut task = TaskContext::new(&args.task_type);
    if let Some(title) = args.title {
        task = task.with_title(title);
    }

    let selection = service
        .dispatch(&task, &args.actor, &args.role, &args.candidates)
        .await?;

    if args.json {
        let output = serde_json::json!({
            "task_id": task.task_id.to_string(),
            "task_type": task.task_type,
            "selection": selection,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{selection}");
    }
    Ok(())
}

pub async fn run_learn(config: &Config, args: LearnArgs) -> Result<()> {
    if config.policy.path.is_none() {
        bail!("policy.path must be configured to record feedback");
    }

    let selection = selection_for(config.learning.mode, args.agents)?;
    let service = DispatchService::from_config(config)?;
    let task = TaskContext::new(&args.task_type);

    let value = service.learn(&task, &selection, args.reward).await?;
    service.save().await.context("Failed to save policy")?;
    debug!(updates = service.stats().await.total_updates, "Policy saved");

    println!("{}|{} = {value}", args.task_type, selection);
    Ok(())
}

fn selection_for(mode: SelectionMode, mut agents: Vec<String>) -> Result<Selection> {
    match mode {
        SelectionMode::Single => {
            if agents.len() != 1 {
                bail!("single mode expects exactly one agent, got {}", agents.len());
            }
            Ok(Selection::Agent(agents.remove(0)))
        }
        SelectionMode::Team => Ok(Selection::Team(Team::new(agents))),
    }
}
