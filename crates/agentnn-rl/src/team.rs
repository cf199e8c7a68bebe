//! Team selection over fixed-size agent combinations

use tracing::{debug, info};

use agentnn_core::{DispatchError, Result, TaskContext};

use crate::algorithm::{Choice, LearningParams, QTable, SelectorStats, TdLearner};
use crate::selector::Selector;
use crate::state::{AgentId, Reward, Selection, Team};
use crate::store::PolicyStore;

/// Operator-supplied transform applied to raw team rewards before learning
pub type RewardShaping = Box<dyn Fn(Reward, &TaskContext) -> Reward + Send + Sync>;

/// All `k`-element combinations of `items`, without repetition.
///
/// Each combination keeps the relative order of `items`, and combinations
/// are produced in lexicographic order of their positions.
pub fn combinations<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    let n = items.len();
    if k > n {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        result.push(indices.iter().map(|&i| items[i].clone()).collect());

        // Rightmost index that can still advance
        let Some(pos) = (0..k).rev().find(|&i| indices[i] < n - k + i) else {
            return result;
        };
        indices[pos] += 1;
        for i in pos + 1..k {
            indices[i] = indices[i - 1] + 1;
        }
    }
}

/// Epsilon-greedy selection of a fixed-size team per task
pub struct TeamSelector {
    learner: TdLearner<Team>,
    team_size: usize,
    reward_shaping: Option<RewardShaping>,
}

impl TeamSelector {
    /// Create a selector seeded from system entropy
    pub fn new(params: LearningParams, team_size: usize) -> Result<Self> {
        Self::build(params, team_size, None)
    }

    /// Create a selector whose exploration is reproducible
    pub fn with_seed(params: LearningParams, team_size: usize, seed: u64) -> Result<Self> {
        Self::build(params, team_size, Some(seed))
    }

    fn build(params: LearningParams, team_size: usize, seed: Option<u64>) -> Result<Self> {
        if team_size == 0 {
            return Err(DispatchError::InvalidArgument(
                "team_size must be at least 1".to_string(),
            ));
        }
        let learner = TdLearner::new(params, TdLearner::<Team>::rng_from_seed(seed))?;
        info!(
            team_size,
            learning_rate = params.learning_rate,
            epsilon = params.epsilon,
            "Team selector initialized"
        );
        Ok(Self {
            learner,
            team_size,
            reward_shaping: None,
        })
    }

    pub fn with_reward_shaping(mut self, shaping: RewardShaping) -> Self {
        self.reward_shaping = Some(shaping);
        self
    }

    pub fn team_size(&self) -> usize {
        self.team_size
    }

    pub fn select_team(&mut self, task: &TaskContext, candidates: &[AgentId]) -> Result<Team> {
        let mut unique: Vec<AgentId> = Vec::with_capacity(candidates.len());
        for agent in candidates {
            if !unique.contains(agent) {
                unique.push(agent.clone());
            }
        }

        let teams: Vec<Team> = combinations(&unique, self.team_size)
            .into_iter()
            .map(Team::new)
            .collect();

        let (team, choice) = self
            .learner
            .choose(&task.task_type, &teams)
            .ok_or(DispatchError::NoCandidates {
                available: unique.len(),
                team_size: self.team_size,
            })?;

        debug!(
            task_type = %task.task_type,
            team = %team,
            options = teams.len(),
            explored = choice == Choice::Explore,
            "Team selected"
        );
        Ok(team.clone())
    }

    pub fn learn_team(&mut self, task: &TaskContext, team: &Team, reward: Reward) -> Result<f64> {
        if team.len() != self.team_size || !team.is_distinct() {
            return Err(DispatchError::InvalidArgument(format!(
                "team {team} is not {} distinct agents",
                self.team_size
            )));
        }

        let shaped = match &self.reward_shaping {
            Some(shape) => shape(reward, task),
            None => reward,
        };
        let value = self.learner.update(&task.task_type, team, shaped);
        debug!(
            task_type = %task.task_type,
            team = %team,
            reward,
            shaped,
            value,
            "Team value updated"
        );
        Ok(value)
    }

    pub fn table(&self) -> &QTable<Team> {
        self.learner.table()
    }

    /// Replace the learned table, rejecting teams that are not `team_size`
    /// distinct agents
    pub fn load_table(&mut self, table: QTable<Team>) -> Result<()> {
        if let Some((_, team, _)) = table
            .iter()
            .find(|(_, t, _)| t.len() != self.team_size || !t.is_distinct())
        {
            return Err(DispatchError::InvalidArgument(format!(
                "team {team} is not {} distinct agents",
                self.team_size
            )));
        }
        self.learner.replace_table(table);
        Ok(())
    }

    pub fn learning_params(&self) -> &LearningParams {
        self.learner.params()
    }
}

impl std::fmt::Debug for TeamSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamSelector")
            .field("learner", &self.learner)
            .field("team_size", &self.team_size)
            .field("reward_shaping", &self.reward_shaping.is_some())
            .finish()
    }
}

impl Selector for TeamSelector {
    fn name(&self) -> &str {
        "team"
    }

    fn select(&mut self, task: &TaskContext, candidates: &[AgentId]) -> Result<Selection> {
        self.select_team(task, candidates).map(Selection::Team)
    }

    fn learn(&mut self, task: &TaskContext, selection: &Selection, reward: Reward) -> Result<f64> {
        match selection {
            Selection::Team(team) => self.learn_team(task, team, reward),
            Selection::Agent(agent) => Err(DispatchError::InvalidArgument(format!(
                "team selector cannot learn from single agent {agent}"
            ))),
        }
    }

    fn params(&self) -> serde_json::Value {
        let mut params = self.learner.params_json();
        params["team_size"] = serde_json::json!(self.team_size);
        params
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
        let team_size = self.team_size;
        let table = store.load_checked(|team: &Team| {
            if team.len() != team_size {
                Err(format!("expected {team_size} agents, found {}", team.len()))
            } else if !team.is_distinct() {
                Err(format!("team {team} repeats an agent"))
            } else {
                Ok(())
            }
        })?;
        let count = table.len();
        self.learner.replace_table(table);
        Ok(count)
    }

    fn set_reward_shaping(&mut self, shaping: RewardShaping) -> Result<()> {
        self.reward_shaping = Some(shaping);
        Ok(())
    }
}
