//! Selector trait and the single-agent Q-table selector

use tracing::{debug, info};

use agentnn_core::{DispatchError, Result, TaskContext};

use crate::algorithm::{Choice, LearningParams, QTable, SelectorStats, TdLearner};
use crate::state::{AgentId, Reward, Selection};
use crate::store::PolicyStore;
use crate::team::RewardShaping;

/// Common interface over single-agent and team selection
pub trait Selector: Send + Sync {
    /// Selector name
    fn name(&self) -> &str;

    /// Pick an executor for `task` among `candidates`
    fn select(&mut self, task: &TaskContext, candidates: &[AgentId]) -> Result<Selection>;

    /// Feed back the observed reward for a previous selection; returns the new value
    fn learn(&mut self, task: &TaskContext, selection: &Selection, reward: Reward) -> Result<f64>;

    /// Get selector parameters as JSON
    fn params(&self) -> serde_json::Value;

    /// Set selector parameters from JSON
    fn set_params(&mut self, params: &serde_json::Value) -> Result<()>;

    fn stats(&self) -> SelectorStats;

    fn save_policy(&self, store: &PolicyStore) -> Result<()>;

    /// Replace the learned table with the persisted one; returns the entry count
    fn load_policy(&mut self, store: &PolicyStore) -> Result<usize>;

    fn set_reward_shaping(&mut self, _shaping: RewardShaping) -> Result<()> {
        Err(DispatchError::InvalidArgument(format!(
            "{} selector does not support reward shaping",
            self.name()
        )))
    }
}

/// Epsilon-greedy selection of one agent per task
#[derive(Debug)]
pub struct SingleAgentSelector {
    learner: TdLearner<AgentId>,
}

impl SingleAgentSelector {
    /// Create a selector seeded from system entropy
    pub fn new(params: LearningParams) -> Result<Self> {
        Self::build(params, None)
    }

    /// Create a selector whose exploration is reproducible
    pub fn with_seed(params: LearningParams, seed: u64) -> Result<Self> {
        Self::build(params, Some(seed))
    }

    pub(crate) fn build(params: LearningParams, seed: Option<u64>) -> Result<Self> {
        let learner = TdLearner::new(params, TdLearner::<AgentId>::rng_from_seed(seed))?;
        info!(
            learning_rate = params.learning_rate,
            epsilon = params.epsilon,
            "Single-agent selector initialized"
        );
        Ok(Self { learner })
    }

    pub fn select_agent(&mut self, task: &TaskContext, candidates: &[AgentId]) -> Result<AgentId> {
        let (agent, choice) = self
            .learner
            .choose(&task.task_type, candidates)
            .ok_or_else(|| {
                DispatchError::InvalidArgument("candidate agent list is empty".to_string())
            })?;

        debug!(
            task_type = %task.task_type,
            agent = %agent,
            explored = choice == Choice::Explore,
            "Agent selected"
        );
        Ok(agent.clone())
    }

    pub fn learn(&mut self, task: &TaskContext, agent: &str, reward: Reward) -> f64 {
        let value = self
            .learner
            .update(&task.task_type, &agent.to_string(), reward);
        debug!(task_type = %task.task_type, agent, reward, value, "Agent value updated");
        value
    }

    pub fn table(&self) -> &QTable<AgentId> {
        self.learner.table()
    }

    pub fn load_table(&mut self, table: QTable<AgentId>) {
        self.learner.replace_table(table);
    }

    pub fn learning_params(&self) -> &LearningParams {
        self.learner.params()
    }
}

impl Selector for SingleAgentSelector {
    fn name(&self) -> &str {
        "single"
    }

    fn select(&mut self, task: &TaskContext, candidates: &[AgentId]) -> Result<Selection> {
        self.select_agent(task, candidates).map(Selection::Agent)
    }

    fn learn(&mut self, task: &TaskContext, selection: &Selection, reward: Reward) -> Result<f64> {
        match selection {
            Selection::Agent(agent) => Ok(SingleAgentSelector::learn(self, task, agent, reward)),
            Selection::Team(team) => Err(DispatchError::InvalidArgument(format!(
                "single-agent selector cannot learn from team {team}"
            ))),
        }
    }

    fn params(&self) -> serde_json::Value {
        self.learner.params_json()
    }

    fn set_params(&mut self, params: &serde_json::Value) -> Result<()> {
        self.learner.set_params(params)
    }

    fn stats(&self) -> SelectorStats {
        self.learner.stats()
    }

    fn save_policy(&self, store: &PolicyStore) -> Result<()> {
        store.save(self.learner.table())
    }

    fn load_policy(&mut self, store: &PolicyStore) -> Result<usize> {
        let table = store.load::<AgentId>()?;
        let count = table.len();
        self.learner.replace_table(table);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agents(names: &[&str]) -> Vec<AgentId> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn greedy() -> SingleAgentSelector {
        SingleAgentSelector::with_seed(LearningParams::new(0.1, 0.9, 0.0), 1).unwrap()
    }

    #[test]
    fn test_empty_table_picks_first_candidate() {
        let mut selector = greedy();
        let task = TaskContext::new("code_review");
        let agent = selector
            .select_agent(&task, &agents(&["A", "B", "C"]))
            .unwrap();
        assert_eq!(agent, "A");
    }

    #[test]
    fn test_learn_scenario() {
        let mut selector = greedy();
        let task = TaskContext::new("code_review");

        selector.learn(&task, "B", 1.0);
        let value = selector.table().value("code_review", &"B".to_string());
        assert!((value - 0.1).abs() < 1e-12);

        selector.learn(&task, "B", 1.0);
        let value = selector.table().value("code_review", &"B".to_string());
        assert!((value - 0.19).abs() < 1e-12);

        let agent = selector
            .select_agent(&task, &agents(&["A", "B", "C"]))
            .unwrap();
        assert_eq!(agent, "B");
    }

    #[test]
    fn test_empty_candidates_rejected() {
        let mut selector = greedy();
        let result = selector.select_agent(&TaskContext::new("x"), &[]);
        assert!(matches!(result, Err(DispatchError::InvalidArgument(_))));
    }

    #[test]
    fn test_states_are_independent() {
        let mut selector = greedy();
        let review = TaskContext::new("code_review");
        let docs = TaskContext::new("docs");
        selector.learn(&review, "C", 1.0);

        let candidates = agents(&["A", "B", "C"]);
        assert_eq!(selector.select_agent(&review, &candidates).unwrap(), "C");
        assert_eq!(selector.select_agent(&docs, &candidates).unwrap(), "A");
    }

    #[test]
    fn test_deterministic_with_zero_epsilon() {
        let mut selector = greedy();
        let task = TaskContext::new("s");
        selector.load_table(QTable::from_entries([
            ("s".to_string(), "A".to_string(), 0.3),
            ("s".to_string(), "B".to_string(), 0.6),
        ]));
        let candidates = agents(&["A", "B", "C"]);
        let first = selector.select_agent(&task, &candidates).unwrap();
        for _ in 0..10 {
            assert_eq!(selector.select_agent(&task, &candidates).unwrap(), first);
        }
        assert_eq!(first, "B");
    }

    #[test]
    fn test_exploration_stays_within_candidates() {
        let mut selector =
            SingleAgentSelector::with_seed(LearningParams::new(0.1, 0.9, 1.0), 9).unwrap();
        let task = TaskContext::new("s");
        let candidates = agents(&["x", "y"]);
        for _ in 0..50 {
            let agent = selector.select_agent(&task, &candidates).unwrap();
            assert!(candidates.contains(&agent));
        }
    }

    #[test]
    fn test_trait_learn_rejects_team() {
        let mut selector = greedy();
        let task = TaskContext::new("s");
        let team = Selection::Team(["A", "B"].into_iter().collect());
        assert!(Selector::learn(&mut selector, &task, &team, 1.0).is_err());
        assert!(Selector::learn(&mut selector, &task, &Selection::Agent("A".into()), 1.0).is_ok());
    }

    #[test]
    fn test_reward_shaping_unsupported() {
        let mut selector = greedy();
        assert!(selector
            .set_reward_shaping(Box::new(|reward: f64, _task: &TaskContext| reward * 2.0))
            .is_err());
    }

    #[test]
    fn test_params_json() {
        let selector = greedy();
        let params = selector.params();
        assert_eq!(params["learning_rate"], 0.1);
        assert_eq!(params["epsilon"], 0.0);
        assert_eq!(params["table_size"], 0);
        assert_eq!(selector.name(), "single");
    }
}
