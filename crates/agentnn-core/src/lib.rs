//! Agent-NN Core - roles, authorization, and task types
//!
//! This crate provides the identity side of the dispatcher: the closed role
//! enumeration, actor role grants, and the authorization engine that gates
//! which agents an actor may direct.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod access;
pub mod error;
pub mod role;
pub mod task;

pub use access::{actions, AuthorizationEngine, IdentityGapPolicy, PermissionTable};
pub use error::{DispatchError, Result};
pub use role::{Role, RoleResolver, StaticRoleResolver};
pub use task::{TaskContext, TaskId};
