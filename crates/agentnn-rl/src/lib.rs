//! Agent-NN RL - Reinforcement learning for agent selection
//!
//! This crate provides epsilon-greedy selectors over single agents and
//! fixed-size teams, a shared temporal-difference update, and a
//! line-oriented store for the learned Q-tables.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithm;
pub mod selector;
pub mod state;
pub mod store;
pub mod team;

pub use algorithm::{LearningParams, QTable, SelectorStats};
pub use selector::{Selector, SingleAgentSelector};
pub use state::{ActionKey, AgentId, Reward, Selection, Team};
pub use store::PolicyStore;
pub use team::{combinations, RewardShaping, TeamSelector};
