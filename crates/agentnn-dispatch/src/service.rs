//! Async wrapper for sharing one dispatcher between concurrent callers
//!
//! Selection and learning read-modify-write the Q-table (and the exploration
//! RNG), so both take the write lock. Pure queries take the read lock.

use anyhow::Result as AnyResult;
use tokio::sync::RwLock;
use tracing::debug;

use agentnn_core::{Result, TaskContext};
use agentnn_rl::{AgentId, Reward, Selection, SelectorStats};

use crate::config::Config;
use crate::dispatcher::Dispatcher;

/// Dispatch service wrapping the dispatcher with async support
pub struct DispatchService {
    dispatcher: RwLock<Dispatcher>,
}

impl DispatchService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: RwLock::new(dispatcher),
        }
    }

    pub fn from_config(config: &Config) -> AnyResult<Self> {
        Ok(Self::new(Dispatcher::from_config(config)?))
    }

    pub async fn dispatch(
        &self,
        task: &TaskContext,
        actor_id: &str,
        role: &str,
        candidates: &[AgentId],
    ) -> Result<Selection> {
        let mut dispatcher = self.dispatcher.write().await;
        dispatcher.dispatch(task, actor_id, role, candidates)
    }

    pub async fn learn(&self, task: &TaskContext, selection: &Selection, reward: Reward) -> Result<f64> {
        let mut dispatcher = self.dispatcher.write().await;
        let value = dispatcher.learn(task, selection, reward)?;
        debug!(task_type = %task.task_type, selection = %selection, value, "Feedback recorded");
        Ok(value)
    }

    pub async fn save(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.write().await;
        dispatcher.save()
    }

    pub async fn is_authorized(&self, actor_id: &str, role: &str, action: &str, resource: &str) -> bool {
        let dispatcher = self.dispatcher.read().await;
        dispatcher.is_authorized(actor_id, role, action, resource)
    }

    pub async fn stats(&self) -> SelectorStats {
        let dispatcher = self.dispatcher.read().await;
        dispatcher.stats()
    }

    pub async fn params(&self) -> serde_json::Value {
        let dispatcher = self.dispatcher.read().await;
        dispatcher.params()
    }

    pub async fn set_params(&self, params: &serde_json::Value) -> Result<()> {
        let mut dispatcher = self.dispatcher.write().await;
        dispatcher.set_params(params)
    }

    /// Consume the service and return the dispatcher
    pub fn into_inner(self) -> Dispatcher {
        self.dispatcher.into_inner()
    }
}
