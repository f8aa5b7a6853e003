//! Rules, memberships and requests

use crate::error::RbacError;
use crate::identity::{Identity, User};
use crate::pattern::{Action, Resource, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Description carried by the synthesized fail-closed rule
pub const DEFAULT_RULE_DESCRIPTION: &str = "<<DEFAULT>>";

/// Rule outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Deny,
}

impl Permission {
    pub fn name(&self) -> &'static str {
        match self {
            Permission::Allow => "allow",
            Permission::Deny => "deny",
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Permission::Allow)
    }
}

impl FromStr for Permission {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Permission::Allow),
            "deny" => Ok(Permission::Deny),
            other => Err(RbacError::InvalidPermission(other.to_string())),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `(permission, action, role, resource)` with every field but the
/// permission holding a compiled pattern. Immutable once built.
#[derive(Debug, Clone)]
pub struct Rule {
    pub permission: Permission,
    pub action: Action,
    pub role: Role,
    pub resource: Resource,
    pub description: String,
}

impl Rule {
    /// The fail-closed rule used when nothing else applies.
    pub fn default_deny(request: &Request) -> Self {
        Self {
            permission: Permission::Deny,
            action: request.action.clone(),
            role: Role::new("*"),
            resource: request.resource.clone(),
            description: DEFAULT_RULE_DESCRIPTION.to_string(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.description == DEFAULT_RULE_DESCRIPTION
    }

    /// One-line summary for logs: `('allow', 'GET', 'admin', '/a/*')`
    pub fn brief(&self) -> String {
        format!(
            "({:?}, {:?}, {:?}, {:?})",
            self.permission.name(),
            self.action.name,
            self.role.name,
            self.resource.name
        )
    }
}

/// Links one role to one user or group
#[derive(Debug, Clone)]
pub struct Membership {
    pub role: Role,
    pub member: Identity,
}

/// The question being asked: may `user` perform `action` on `resource`?
#[derive(Debug, Clone)]
pub struct Request {
    pub resource: Resource,
    pub action: Action,
    /// `None` when the caller could not be resolved to a known user
    pub user: Option<User>,
}

impl Request {
    pub fn new(resource: Resource, action: Action, user: Option<User>) -> Self {
        Self {
            resource,
            action,
            user,
        }
    }
}
