//! Action keys, rewards, and selections

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Reward value observed after executing a task
pub type Reward = f64;

/// Agent identifier as supplied by the caller
pub type AgentId = String;

/// Separator between team members in an encoded team key
pub const TEAM_SEPARATOR: char = ',';

/// An action a Q-table can be keyed by.
///
/// `encode`/`decode` define the persisted text form of the action.
pub trait ActionKey: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static {
    fn encode(&self) -> String;

    /// Parse an encoded action, `None` if malformed
    fn decode(raw: &str) -> Option<Self>;

    /// Agent identifiers this action is made of
    fn agent_ids(&self) -> Vec<&str>;
}

impl ActionKey for AgentId {
    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn agent_ids(&self) -> Vec<&str> {
        vec![self.as_str()]
    }
}

/// An ordered tuple of agents, in the order the candidates were supplied
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Team(Vec<AgentId>);

impl Team {
    pub fn new(members: Vec<AgentId>) -> Self {
        Self(members)
    }

    pub fn members(&self) -> &[AgentId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether no agent appears twice
    pub fn is_distinct(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(i, a)| !self.0[..i].contains(a))
    }

    pub fn into_inner(self) -> Vec<AgentId> {
        self.0
    }
}

impl<S: Into<AgentId>> FromIterator<S> for Team {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

impl ActionKey for Team {
    fn encode(&self) -> String {
        self.0.join(&TEAM_SEPARATOR.to_string())
    }

    fn decode(raw: &str) -> Option<Self> {
        Some(Self(raw.split(TEAM_SEPARATOR).map(str::to_string).collect()))
    }

    fn agent_ids(&self) -> Vec<&str> {
        self.0.iter().map(String::as_str).collect()
    }
}

/// What a selector picked for a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    Agent(AgentId),
    Team(Team),
}

impl Selection {
    /// Agents making up the selection, in order
    pub fn agents(&self) -> Vec<&str> {
        match self {
            Selection::Agent(agent) => vec![agent.as_str()],
            Selection::Team(team) => team.agent_ids(),
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::Agent(agent) => f.write_str(agent),
            Selection::Team(team) => f.write_str(&team.encode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_key() {
        let agent: AgentId = "writer-1".to_string();
        assert_eq!(agent.encode(), "writer-1");
        assert_eq!(AgentId::decode("writer-1"), Some(agent));
        assert_eq!(AgentId::decode(""), Some(String::new()));
    }

    #[test]
    fn test_team_key() {
        let team: Team = ["a1", "a2"].into_iter().collect();
        assert_eq!(team.encode(), "a1,a2");
        assert_eq!(Team::decode("a1,a2"), Some(team.clone()));
        assert_eq!(
            Team::decode("a1,,a2"),
            Some(["a1", "", "a2"].into_iter().collect())
        );
        assert_eq!(team.to_string(), "(a1, a2)");
        assert_eq!(team.members(), &["a1".to_string(), "a2".to_string()]);
    }

    #[test]
    fn test_team_distinct() {
        let team: Team = ["a", "b", "c"].into_iter().collect();
        assert!(team.is_distinct());
        let dup: Team = ["a", "b", "a"].into_iter().collect();
        assert!(!dup.is_distinct());
    }

    #[test]
    fn test_selection_display_and_agents() {
        let single = Selection::Agent("A".to_string());
        assert_eq!(single.to_string(), "A");
        assert_eq!(single.agents(), vec!["A"]);

        let team = Selection::Team(["A", "B"].into_iter().collect());
        assert_eq!(team.to_string(), "A,B");
        assert_eq!(team.agents(), vec!["A", "B"]);
    }

    #[test]
    fn test_selection_serialization() {
        let team = Selection::Team(["A", "B"].into_iter().collect());
        let json = serde_json::to_string(&team).unwrap();
        assert_eq!(json, r#"{"team":["A","B"]}"#);
        let parsed: Selection = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, team);
    }
}
