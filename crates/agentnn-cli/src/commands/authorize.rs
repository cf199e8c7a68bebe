//! Authorization queries

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use agentnn_core::AuthorizationEngine;
use agentnn_dispatch::Config;

#[derive(Args)]
pub struct AuthorizeArgs {
    /// Actor performing the action
    #[arg(long)]
    pub actor: String,

    /// Role the actor is acting under
    #[arg(long)]
    pub role: String,

    /// Action name (e.g. submit_task, vote)
    #[arg(long)]
    pub action: String,

    /// Resource the action targets
    #[arg(long, default_value = "")]
    pub resource: String,
}

pub async fn run(config: &Config, args: AuthorizeArgs) -> Result<()> {
    let engine = AuthorizationEngine::new(Arc::new(config.access.resolver()))
        .with_permissions(config.access.permissions()?)
        .with_identity_gap(config.access.identity_gap);

    let allowed = engine.is_authorized(&args.actor, &args.role, &args.action, &args.resource);
    println!("{}", if allowed { "allowed" } else { "denied" });
    Ok(())
}
