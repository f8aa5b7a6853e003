//! Identities: users, groups and their credentials

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named group of users
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
        }
    }
}

/// A user and the groups it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl User {
    /// Create a user with no groups. The description is `@name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("@{name}"),
            name,
            groups: Vec::new(),
        }
    }

    /// Add groups to the user
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = Group>) -> Self {
        self.groups.extend(groups);
        self
    }
}

/// Either side of a membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    User(User),
    Group(Group),
}

impl Identity {
    pub fn name(&self) -> &str {
        match self {
            Identity::User(user) => &user.name,
            Identity::Group(group) => &group.name,
        }
    }

    /// Same kind and same name.
    pub fn is_same(&self, other: &Identity) -> bool {
        match (self, other) {
            (Identity::User(a), Identity::User(b)) => a.name == b.name,
            (Identity::Group(a), Identity::Group(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Identity::User(user)
    }
}

impl From<Group> for Identity {
    fn from(group: Group) -> Self {
        Identity::Group(group)
    }
}

/// Stored password record from `password.txt`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Password {
    pub name: String,
    pub password: String,
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A username/password pair presented by a client
#[derive(Clone, PartialEq, Eq)]
pub struct UserPass {
    pub username: String,
    pub password: String,
}

impl UserPass {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for UserPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPass")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session cookie handed out by login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
