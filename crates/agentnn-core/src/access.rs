//! Role-based authorization
//!
//! A query is a pure function of the actor's granted roles and the
//! role→action table. The `resource` argument is carried for
//! resource-scoped policies and is not consulted yet.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::role::{normalize, Role, RoleResolver};

/// Action names known to the built-in permission table
pub mod actions {
    pub const SUBMIT_TASK: &str = "submit_task";
    pub const WRITE_OUTPUT: &str = "write_output";
    pub const RETRIEVE_MEMORY: &str = "retrieve_memory";
    pub const VIEW_CONTEXT: &str = "view_context";
    pub const VOTE: &str = "vote";
    pub const MODIFY_CONTRACT: &str = "modify_contract";
}

/// What to do when an actor has no declared roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityGapPolicy {
    /// Trust the asserted role and check it against the action table
    #[default]
    Unrestricted,
    /// Deny every action
    Deny,
}

/// Static role → allowed-actions relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    actions: HashMap<Role, BTreeSet<String>>,
}

impl PermissionTable {
    /// The built-in table. Coordinator covers every administrative action.
    pub fn builtin() -> Self {
        use actions::*;

        let table: [(Role, &[&str]); 6] = [
            (Role::Writer, &[SUBMIT_TASK, WRITE_OUTPUT]),
            (Role::Retriever, &[RETRIEVE_MEMORY, VIEW_CONTEXT]),
            (Role::Critic, &[VOTE]),
            (Role::Analyst, &[VIEW_CONTEXT, SUBMIT_TASK]),
            (Role::Reviewer, &[VOTE, VIEW_CONTEXT]),
            (
                Role::Coordinator,
                &[
                    SUBMIT_TASK,
                    VIEW_CONTEXT,
                    WRITE_OUTPUT,
                    VOTE,
                    RETRIEVE_MEMORY,
                    MODIFY_CONTRACT,
                ],
            ),
        ];

        let actions = table
            .into_iter()
            .map(|(role, names)| (role, names.iter().map(|a| (*a).to_string()).collect()))
            .collect();

        Self { actions }
    }

    /// Add extra actions to a role
    pub fn extend<I, S>(&mut self, role: Role, actions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions
            .entry(role)
            .or_default()
            .extend(actions.into_iter().map(Into::into));
    }

    pub fn actions_for(&self, role: Role) -> Option<&BTreeSet<String>> {
        self.actions.get(&role)
    }

    pub fn allows(&self, role: Role, action: &str) -> bool {
        self.actions
            .get(&role)
            .is_some_and(|allowed| allowed.contains(action))
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Answers "may this actor, acting as this role, perform this action?"
#[derive(Clone)]
pub struct AuthorizationEngine {
    resolver: Arc<dyn RoleResolver>,
    permissions: PermissionTable,
    identity_gap: IdentityGapPolicy,
}

impl AuthorizationEngine {
    pub fn new(resolver: Arc<dyn RoleResolver>) -> Self {
        Self {
            resolver,
            permissions: PermissionTable::builtin(),
            identity_gap: IdentityGapPolicy::default(),
        }
    }

    pub fn with_permissions(mut self, permissions: PermissionTable) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_identity_gap(mut self, policy: IdentityGapPolicy) -> Self {
        self.identity_gap = policy;
        self
    }

    pub fn identity_gap(&self) -> IdentityGapPolicy {
        self.identity_gap
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    /// Effective actions available to `role`, after alias expansion
    pub fn effective_actions(&self, role: &str) -> BTreeSet<String> {
        self.resolver
            .expand_roles(&[normalize(role)])
            .into_iter()
            .filter_map(|r| self.permissions.actions_for(r))
            .flatten()
            .cloned()
            .collect()
    }

    pub fn is_authorized(&self, actor_id: &str, role: &str, action: &str, _resource: &str) -> bool {
        let role = normalize(role);
        let granted = self.resolver.resolve_roles(actor_id);

        if granted.is_empty() {
            match self.identity_gap {
                IdentityGapPolicy::Deny => {
                    debug!(actor_id, role = %role, action, "Denied: actor has no declared roles");
                    return false;
                }
                IdentityGapPolicy::Unrestricted => {
                    warn!(actor_id, role = %role, "Actor has no declared roles, trusting asserted role");
                }
            }
        } else if !granted.contains(&role) {
            debug!(actor_id, role = %role, action, "Denied: role not granted to actor");
            return false;
        }

        let allowed = self.effective_actions(&role).contains(action);
        if !allowed {
            debug!(actor_id, role = %role, action, "Denied: action not permitted for role");
        }
        allowed
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("permissions", &self.permissions)
            .field("identity_gap", &self.identity_gap)
            .finish_non_exhaustive()
    }
}
