//! Roles and role resolution

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Predefined agent roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Produces written output
    Writer,
    /// Fetches memory and context
    Retriever,
    /// Votes on results
    Critic,
    /// Inspects context and submits follow-up work
    Analyst,
    /// Reviews and votes
    Reviewer,
    /// Cross-cutting administrative role
    Coordinator,
}

impl Role {
    /// All roles, in declaration order
    pub fn all() -> &'static [Role] {
        &[
            Role::Writer,
            Role::Retriever,
            Role::Critic,
            Role::Analyst,
            Role::Reviewer,
            Role::Coordinator,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Writer => "writer",
            Role::Retriever => "retriever",
            Role::Critic => "critic",
            Role::Analyst => "analyst",
            Role::Reviewer => "reviewer",
            Role::Coordinator => "coordinator",
        }
    }

    /// Parse a role name, ignoring case and surrounding whitespace.
    /// Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match normalize(name).as_str() {
            "writer" => Some(Role::Writer),
            "retriever" => Some(Role::Retriever),
            "critic" => Some(Role::Critic),
            "analyst" => Some(Role::Analyst),
            "reviewer" => Some(Role::Reviewer),
            "coordinator" => Some(Role::Coordinator),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| DispatchError::InvalidArgument(format!("unknown role: {s}")))
    }
}

/// Canonical form of a role name for comparisons
pub(crate) fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Maps actors to the roles they may assume and expands role aliases.
///
/// Both lookups are pure with respect to the resolver's configuration.
pub trait RoleResolver: Send + Sync {
    /// Role names the actor may assume. Empty means no declared restriction.
    fn resolve_roles(&self, actor_id: &str) -> BTreeSet<String>;

    /// The input roles plus every role they alias, transitively.
    /// Names that are neither a [`Role`] nor an alias are dropped.
    fn expand_roles(&self, roles: &[String]) -> BTreeSet<Role>;
}

/// Configuration-backed resolver
#[derive(Debug, Clone, Default)]
pub struct StaticRoleResolver {
    grants: HashMap<String, BTreeSet<String>>,
    aliases: HashMap<String, Vec<String>>,
}

impl StaticRoleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `actor_id` to assume `roles` (in addition to existing grants)
    pub fn with_grant<I, S>(mut self, actor_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.grant(actor_id, roles);
        self
    }

    /// Make `alias` expand to `roles`
    pub fn with_alias<I, S>(mut self, alias: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.aliases
            .entry(normalize(alias))
            .or_default()
            .extend(roles.into_iter().map(|r| normalize(r.as_ref())));
        self
    }

    pub fn grant<I, S>(&mut self, actor_id: impl Into<String>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.grants
            .entry(actor_id.into())
            .or_default()
            .extend(roles.into_iter().map(|r| normalize(r.as_ref())));
    }

    /// Build from plain maps, as read from configuration
    pub fn from_maps(
        grants: &HashMap<String, Vec<String>>,
        aliases: &HashMap<String, Vec<String>>,
    ) -> Self {
        let mut resolver = Self::new();
        for (actor, roles) in grants {
            resolver.grant(actor.clone(), roles);
        }
        for (alias, roles) in aliases {
            resolver = resolver.with_alias(alias, roles);
        }
        resolver
    }

    pub fn actor_count(&self) -> usize {
        self.grants.len()
    }
}

impl RoleResolver for StaticRoleResolver {
    fn resolve_roles(&self, actor_id: &str) -> BTreeSet<String> {
        self.grants.get(actor_id).cloned().unwrap_or_default()
    }

    fn expand_roles(&self, roles: &[String]) -> BTreeSet<Role> {
        let mut expanded = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut pending: Vec<String> = roles.iter().map(|r| normalize(r)).collect();

        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(role) = Role::parse(&name) {
                expanded.insert(role);
            }
            if let Some(targets) = self.aliases.get(&name) {
                pending.extend(targets.iter().cloned());
            }
        }

        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!(Role::parse("writer"), Some(Role::Writer));
        assert_eq!(Role::parse("  Coordinator "), Some(Role::Coordinator));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::Reviewer.to_string(), "reviewer");
        assert!("critic".parse::<Role>().is_ok());
        assert!("nobody".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Analyst).unwrap();
        assert_eq!(json, "\"analyst\"");
        let parsed: Role = serde_json::from_str("\"retriever\"").unwrap();
        assert_eq!(parsed, Role::Retriever);
    }

    #[test]
    fn test_all_roles() {
        assert_eq!(Role::all().len(), 6);
        for role in Role::all() {
            assert_eq!(Role::parse(role.as_str()), Some(*role));
        }
    }

    #[test]
    fn test_unknown_actor_has_no_roles() {
        let resolver = StaticRoleResolver::new().with_grant("alice", ["writer"]);
        assert!(resolver.resolve_roles("bob").is_empty());
        assert_eq!(
            resolver.resolve_roles("alice"),
            BTreeSet::from(["writer".to_string()])
        );
    }

    #[test]
    fn test_grants_are_normalized() {
        let resolver = StaticRoleResolver::new().with_grant("alice", ["Writer ", "CRITIC"]);
        let roles = resolver.resolve_roles("alice");
        assert!(roles.contains("writer"));
        assert!(roles.contains("critic"));
    }

    #[test]
    fn test_expand_drops_unknown() {
        let resolver = StaticRoleResolver::new();
        let expanded = resolver.expand_roles(&["writer".into(), "wizard".into()]);
        assert_eq!(expanded, BTreeSet::from([Role::Writer]));
    }

    #[test]
    fn test_expand_aliases_transitively() {
        let resolver = StaticRoleResolver::new()
            .with_alias("lead", ["reviewer", "editor"])
            .with_alias("editor", ["writer"]);
        let expanded = resolver.expand_roles(&["lead".into()]);
        assert_eq!(expanded, BTreeSet::from([Role::Writer, Role::Reviewer]));
    }

    #[test]
    fn test_expand_alias_cycle_terminates() {
        let resolver = StaticRoleResolver::new()
            .with_alias("a", ["b", "critic"])
            .with_alias("b", ["a"]);
        let expanded = resolver.expand_roles(&["a".into()]);
        assert_eq!(expanded, BTreeSet::from([Role::Critic]));
    }

    #[test]
    fn test_from_maps() {
        let grants = HashMap::from([("svc".to_string(), vec!["analyst".to_string()])]);
        let aliases = HashMap::from([("ops".to_string(), vec!["coordinator".to_string()])]);
        let resolver = StaticRoleResolver::from_maps(&grants, &aliases);
        assert_eq!(resolver.actor_count(), 1);
        assert!(resolver
            .expand_roles(&["ops".into()])
            .contains(&Role::Coordinator));
    }
}
