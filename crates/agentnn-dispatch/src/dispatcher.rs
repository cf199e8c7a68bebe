//! Dispatcher - routes tasks to authorized agents through a learning selector
//!
//! The dispatcher is the composition root: authorization filters the
//! candidate list, the selector picks among the survivors, and feedback
//! flows back into the selector's Q-table (and optionally to disk).

use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use tracing::{debug, info, warn};

use agentnn_core::{AuthorizationEngine, DispatchError, Result, RoleResolver, TaskContext};
use agentnn_rl::{
    AgentId, PolicyStore, Reward, RewardShaping, Selection, Selector, SelectorStats,
    SingleAgentSelector, TeamSelector,
};

use crate::config::{Config, SelectionMode};

/// Authorization-gated learning dispatcher
pub struct Dispatcher {
    auth: AuthorizationEngine,
    selector: Box<dyn Selector>,
    dispatch_action: String,
    store: Option<PolicyStore>,
    save_interval: usize,
    updates_since_save: usize,
}

impl Dispatcher {
    pub fn new(auth: AuthorizationEngine, selector: Box<dyn Selector>) -> Self {
        Self {
            auth,
            selector,
            dispatch_action: agentnn_core::actions::SUBMIT_TASK.to_string(),
            store: None,
            save_interval: 0,
            updates_since_save: 0,
        }
    }

    /// Build a dispatcher from configuration, loading any persisted policy.
    ///
    /// A policy file that exists but cannot be parsed aborts construction.
    pub fn from_config(config: &Config) -> AnyResult<Self> {
        config.validate()?;

        let resolver: Arc<dyn RoleResolver> = Arc::new(config.access.resolver());
        let auth = AuthorizationEngine::new(resolver)
            .with_permissions(config.access.permissions()?)
            .with_identity_gap(config.access.identity_gap);

        let params = config.learning.params();
        let selector: Box<dyn Selector> = match (config.learning.mode, config.learning.seed) {
            (SelectionMode::Single, Some(seed)) => {
                Box::new(SingleAgentSelector::with_seed(params, seed)?)
            }
            (SelectionMode::Single, None) => Box::new(SingleAgentSelector::new(params)?),
            (SelectionMode::Team, Some(seed)) => Box::new(TeamSelector::with_seed(
                params,
                config.learning.team_size,
                seed,
            )?),
            (SelectionMode::Team, None) => {
                Box::new(TeamSelector::new(params, config.learning.team_size)?)
            }
        };

        let mut dispatcher = Self::new(auth, selector)
            .with_dispatch_action(config.access.dispatch_action.clone());

        if let Some(path) = &config.policy.path {
            dispatcher = dispatcher
                .with_policy_store(PolicyStore::new(path), config.policy.save_interval)
                .with_context(|| format!("Failed to load policy from {}", path.display()))?;
        }

        info!(
            selector = dispatcher.selector.name(),
            dispatch_action = %dispatcher.dispatch_action,
            persistent = dispatcher.store.is_some(),
            "Dispatcher initialized"
        );
        Ok(dispatcher)
    }

    pub fn with_dispatch_action(mut self, action: impl Into<String>) -> Self {
        self.dispatch_action = action.into();
        self
    }

    /// Attach a policy store and load the table it holds
    pub fn with_policy_store(mut self, store: PolicyStore, save_interval: usize) -> Result<Self> {
        let entries = self.selector.load_policy(&store)?;
        debug!(path = ?store.path(), entries, "Policy attached");
        self.store = Some(store);
        self.save_interval = save_interval;
        Ok(self)
    }

    /// Shape team rewards before they reach the Q-table
    pub fn with_reward_shaping(mut self, shaping: RewardShaping) -> Result<Self> {
        self.selector.set_reward_shaping(shaping)?;
        Ok(self)
    }

    pub fn authorization(&self) -> &AuthorizationEngine {
        &self.auth
    }

    pub fn selector(&self) -> &dyn Selector {
        self.selector.as_ref()
    }

    pub fn policy_store(&self) -> Option<&PolicyStore> {
        self.store.as_ref()
    }

    pub fn is_authorized(&self, actor_id: &str, role: &str, action: &str, resource: &str) -> bool {
        self.auth.is_authorized(actor_id, role, action, resource)
    }

    /// Candidates the actor may direct, in their original order
    pub fn authorized_candidates(
        &self,
        actor_id: &str,
        role: &str,
        candidates: &[AgentId],
    ) -> Vec<AgentId> {
        candidates
            .iter()
            .filter(|agent| {
                self.auth
                    .is_authorized(actor_id, role, &self.dispatch_action, agent)
            })
            .cloned()
            .collect()
    }

    /// Pick the executor(s) for `task` among the candidates the actor may direct
    pub fn dispatch(
        &mut self,
        task: &TaskContext,
        actor_id: &str,
        role: &str,
        candidates: &[AgentId],
    ) -> Result<Selection> {
        let allowed = self.authorized_candidates(actor_id, role, candidates);
        if allowed.is_empty() {
            debug!(
                actor_id,
                role,
                candidates = candidates.len(),
                "Dispatch refused: no authorized candidates"
            );
            return Err(DispatchError::Unauthorized {
                actor: actor_id.to_string(),
                role: role.to_string(),
                action: self.dispatch_action.clone(),
            });
        }

        let selection = self.selector.select(task, &allowed)?;
        info!(
            task_id = %task.task_id,
            task_type = %task.task_type,
            actor_id,
            selection = %selection,
            "Task dispatched"
        );
        Ok(selection)
    }

    /// Feed back the observed reward for a previous selection.
    ///
    /// Autosaves every `save_interval` updates; save errors are returned
    /// after the update has been applied.
    pub fn learn(&mut self, task: &TaskContext, selection: &Selection, reward: Reward) -> Result<f64> {
        let value = self.selector.learn(task, selection, reward)?;
        self.updates_since_save += 1;

        if self.save_interval > 0 && self.updates_since_save >= self.save_interval {
            if let Err(e) = self.save() {
                warn!("Autosave failed: {}", e);
                return Err(e);
            }
        }

        Ok(value)
    }

    /// Persist the current table. Without a store this is a no-op.
    pub fn save(&mut self) -> Result<()> {
        let Some(store) = &self.store else {
            debug!("No policy store configured, skipping save");
            return Ok(());
        };
        self.selector.save_policy(store)?;
        self.updates_since_save = 0;
        Ok(())
    }

    pub fn stats(&self) -> SelectorStats {
        self.selector.stats()
    }

    pub fn params(&self) -> serde_json::Value {
        self.selector.params()
    }

    pub fn set_params(&mut self, params: &serde_json::Value) -> Result<()> {
        self.selector.set_params(params)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("auth", &self.auth)
            .field("selector", &self.selector.name())
            .field("dispatch_action", &self.dispatch_action)
            .field("store", &self.store)
            .field("save_interval", &self.save_interval)
            .finish_non_exhaustive()
    }
}
