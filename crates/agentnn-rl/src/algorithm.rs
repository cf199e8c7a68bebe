//! Tabular temporal-difference learning shared by every selector

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use agentnn_core::{DispatchError, Result};

use crate::state::{ActionKey, Reward};

/// Learned values keyed by (state, action). Missing entries read as 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable<A: ActionKey> {
    entries: HashMap<String, HashMap<A, f64>>,
}

impl<A: ActionKey> QTable<A> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build a table from previously learned values (the load path)
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, A, f64)>,
    {
        let mut table = Self::new();
        for (state, action, value) in entries {
            table.entries.entry(state).or_default().insert(action, value);
        }
        table
    }

    pub fn get(&self, state: &str, action: &A) -> Option<f64> {
        self.entries.get(state)?.get(action).copied()
    }

    pub fn value(&self, state: &str, action: &A) -> f64 {
        self.get(state, action).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all (state, action, value) entries, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &A, f64)> {
        self.entries.iter().flat_map(|(state, actions)| {
            actions
                .iter()
                .map(move |(action, value)| (state.as_str(), action, *value))
        })
    }

    /// Highest-valued candidate for `state`. Ties go to the earliest candidate;
    /// NaN ranks below every number.
    pub fn best<'a>(&self, state: &str, candidates: &'a [A]) -> Option<&'a A> {
        let mut best: Option<(&'a A, f64)> = None;
        for candidate in candidates {
            let value = self.value(state, candidate);
            let value = if value.is_nan() { f64::NEG_INFINITY } else { value };
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((candidate, value)),
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    /// `value ← value + α · (reward − value)`, creating the entry at 0.0
    fn td_update(&mut self, state: &str, action: &A, reward: Reward, learning_rate: f64) -> f64 {
        let slot = self
            .entries
            .entry(state.to_string())
            .or_default()
            .entry(action.clone())
            .or_insert(0.0);
        let next = *slot + learning_rate * (reward - *slot);
        // infinite values absorb further updates instead of turning into NaN
        if !next.is_nan() || reward.is_nan() {
            *slot = next;
        }
        *slot
    }
}

impl<A: ActionKey> Default for QTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hyperparameters shared by both selectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LearningParams {
    /// α in (0, 1]
    pub learning_rate: f64,
    /// γ; kept for parity with multi-step learners, unused by the
    /// single-step update
    pub discount: f64,
    /// ε in [0, 1]
    pub epsilon: f64,
    /// Multiplied into ε after every update; 1.0 disables decay
    pub epsilon_decay: f64,
    /// Lower bound for decayed ε
    pub min_epsilon: f64,
}

impl LearningParams {
    pub fn new(learning_rate: f64, discount: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            discount,
            epsilon,
            ..Self::default()
        }
    }

    pub fn with_epsilon_decay(mut self, decay: f64, min_epsilon: f64) -> Self {
        self.epsilon_decay = decay;
        self.min_epsilon = min_epsilon;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(DispatchError::InvalidArgument(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(DispatchError::InvalidArgument(format!(
                "discount must be in [0, 1], got {}",
                self.discount
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(DispatchError::InvalidArgument(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(DispatchError::InvalidArgument(format!(
                "epsilon_decay must be in (0, 1], got {}",
                self.epsilon_decay
            )));
        }
        if !(0.0..=1.0).contains(&self.min_epsilon) {
            return Err(DispatchError::InvalidArgument(format!(
                "min_epsilon must be in [0, 1], got {}",
                self.min_epsilon
            )));
        }
        Ok(())
    }
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount: 0.9,
            epsilon: 0.1,
            epsilon_decay: 1.0,
            min_epsilon: 0.01,
        }
    }
}

/// Selector statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorStats {
    pub total_updates: u64,
    pub total_reward: f64,
    pub average_reward: f64,
    pub table_size: usize,
}

/// Whether a choice explored or exploited the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Explore,
    Exploit,
}

/// Epsilon-greedy learner over an arbitrary action key.
///
/// Owns the Q-table and the random source used for exploration.
#[derive(Debug)]
pub(crate) struct TdLearner<A: ActionKey> {
    table: QTable<A>,
    params: LearningParams,
    rng: StdRng,
    total_updates: u64,
    total_reward: f64,
}

impl<A: ActionKey> TdLearner<A> {
    pub(crate) fn new(params: LearningParams, rng: StdRng) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            table: QTable::new(),
            params,
            rng,
            total_updates: 0,
            total_reward: 0.0,
        })
    }

    pub(crate) fn rng_from_seed(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub(crate) fn table(&self) -> &QTable<A> {
        &self.table
    }

    pub(crate) fn replace_table(&mut self, table: QTable<A>) {
        self.table = table;
    }

    pub(crate) fn params(&self) -> &LearningParams {
        &self.params
    }

    /// Epsilon-greedy choice among `options`; `None` only if `options` is empty
    pub(crate) fn choose<'a>(&mut self, state: &str, options: &'a [A]) -> Option<(&'a A, Choice)> {
        if options.is_empty() {
            return None;
        }
        if self.rng.gen::<f64>() < self.params.epsilon {
            return options.choose(&mut self.rng).map(|o| (o, Choice::Explore));
        }
        self.table.best(state, options).map(|o| (o, Choice::Exploit))
    }

    /// Apply the temporal-difference update and decay ε; returns the new value
    pub(crate) fn update(&mut self, state: &str, action: &A, reward: Reward) -> f64 {
        let value = self
            .table
            .td_update(state, action, reward, self.params.learning_rate);

        self.total_updates += 1;
        self.total_reward += reward;

        if self.params.epsilon_decay < 1.0 {
            self.params.epsilon =
                (self.params.epsilon * self.params.epsilon_decay).max(self.params.min_epsilon);
        }

        value
    }

    pub(crate) fn stats(&self) -> SelectorStats {
        SelectorStats {
            total_updates: self.total_updates,
            total_reward: self.total_reward,
            average_reward: if self.total_updates > 0 {
                self.total_reward / self.total_updates as f64
            } else {
                0.0
            },
            table_size: self.table.len(),
        }
    }

    pub(crate) fn params_json(&self) -> serde_json::Value {
        serde_json::json!({
            "learning_rate": self.params.learning_rate,
            "discount": self.params.discount,
            "epsilon": self.params.epsilon,
            "epsilon_decay": self.params.epsilon_decay,
            "min_epsilon": self.params.min_epsilon,
            "table_size": self.table.len(),
        })
    }

    /// Update any of `learning_rate`, `discount`, `epsilon` present in `params`.
    /// Nothing changes if the result would be invalid.
    pub(crate) fn set_params(&mut self, params: &serde_json::Value) -> Result<()> {
        let mut next = self.params;
        if let Some(lr) = params["learning_rate"].as_f64() {
            next.learning_rate = lr;
        }
        if let Some(discount) = params["discount"].as_f64() {
            next.discount = discount;
        }
        if let Some(eps) = params["epsilon"].as_f64() {
            next.epsilon = eps;
        }
        next.validate()?;
        self.params = next;
        Ok(())
    }
}
