//! Line grammars for user, membership, password and rule files
//!
//! ```text
//! user     NAMES GROUPS                      # alice,bob admins,staff
//! member   ROLE MEMBERS                      # admin @alice,admins
//! password NAME PASSWORD                     # alice s3cret
//! rule     PERMISSION ACTIONS ROLES RESOURCES  # allow GET,HEAD reader *.txt
//! ```
//!
//! `#` starts a comment. List fields are comma separated and rule lists
//! expand to their full cartesian product.

use crate::error::{RbacError, Result};
use crate::identity::{Group, Identity, Password, User};
use crate::path::clean_path;
use crate::pattern::{Action, Resource, Role};
use crate::rule::{Membership, Permission, Rule};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What to do with a line that matches no grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedLines {
    /// Ignore it
    #[default]
    Skip,
    /// Ignore it but log a warning
    Warn,
    /// Fail the whole load
    Reject,
}

static RULE_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rule\s+(?P<permission>\S+)\s+(?P<action>\S+)\s+(?P<role>\S+)\s+(?P<resource>\S+)$")
        .expect("rule grammar")
});

static MEMBER_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^member\s+(?P<role>\S+)\s+(?P<members>\S+)$").expect("member grammar")
});

static USER_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^user\s+(?P<user>\S+)\s+(?P<groups>\S+)$").expect("user grammar")
});

static PASSWORD_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^password\s+(?P<name>\S+)\s+(?P<password>\S+)$").expect("password grammar")
});

/// Parses the text of one config file.
///
/// `prefix` is the directory the text was loaded for; it is prepended to
/// every rule resource before the path is cleaned and compiled.
#[derive(Debug, Clone, Default)]
pub struct TextLoader {
    prefix: String,
    source: String,
    unmatched: UnmatchedLines,
}

impl TextLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Name used for the source in logs and errors
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_unmatched(mut self, unmatched: UnmatchedLines) -> Self {
        self.unmatched = unmatched;
        self
    }

    pub fn read_rules(&self, text: &str) -> Result<Vec<Rule>> {
        self.parse_lines(text, &RULE_RX, |caps, line| self.parse_rule_line(caps, line))
    }

    pub fn read_users(&self, text: &str) -> Result<Vec<User>> {
        self.parse_lines(text, &USER_RX, |caps, _| Ok(parse_user_line(caps)))
    }

    pub fn read_memberships(&self, text: &str) -> Result<Vec<Membership>> {
        self.parse_lines(text, &MEMBER_RX, |caps, _| Ok(parse_membership_line(caps)))
    }

    pub fn read_passwords(&self, text: &str) -> Result<Vec<Password>> {
        self.parse_lines(text, &PASSWORD_RX, |caps, _| {
            Ok(vec![Password {
                name: caps["name"].to_string(),
                password: caps["password"].to_string(),
            }])
        })
    }

    fn parse_rule_line(&self, caps: &Captures<'_>, line: usize) -> Result<Vec<Rule>> {
        let permission: Permission = caps["permission"].parse()?;
        let actions = parse_list(&caps["action"]);
        let roles = parse_list(&caps["role"]);
        let resources = parse_list(&caps["resource"]);

        let mut rules = Vec::with_capacity(actions.len() * roles.len() * resources.len());
        for action in &actions {
            for role in &roles {
                for resource in &resources {
                    let rule = Rule {
                        permission,
                        action: Action::parse(action, true)?,
                        role: Role::parse(role, true)?,
                        resource: Resource::parse(&self.resource_spec(resource), false)?,
                        description: format!("{}:{}", self.source, line),
                    };
                    debug!(
                        "rule: {} {} {} {}  # {}",
                        rule.permission,
                        rule.action.name,
                        rule.role.name,
                        rule.resource.name,
                        rule.resource.description
                    );
                    rules.push(rule);
                }
            }
        }
        Ok(rules)
    }

    /// Prefix and clean a resource token, keeping a leading `!` in front.
    fn resource_spec(&self, resource: &str) -> String {
        match resource.strip_prefix('!') {
            Some(rest) => format!("!{}", clean_path(&format!("{}{}", self.prefix, rest))),
            None => clean_path(&format!("{}{}", self.prefix, resource)),
        }
    }

    fn parse_lines<T, F>(&self, text: &str, rx: &Regex, parse: F) -> Result<Vec<T>>
    where
        F: Fn(&Captures<'_>, usize) -> Result<Vec<T>>,
    {
        let mut items = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = trim_line(raw);
            if line.is_empty() {
                continue;
            }
            let parsed = match rx.captures(line) {
                Some(caps) => parse(&caps, line_no),
                None => Err(RbacError::Parse {
                    file: self.source.clone(),
                    line: line_no,
                    text: line.to_string(),
                }),
            };
            match parsed {
                Ok(parsed) => items.extend(parsed),
                Err(err) => self.unmatched_line(line_no, line, err)?,
            }
        }
        Ok(items)
    }

    fn unmatched_line(&self, line_no: usize, line: &str, err: RbacError) -> Result<()> {
        match self.unmatched {
            UnmatchedLines::Skip => {
                debug!("{}:{}: skipped {:?}: {}", self.source, line_no, line, err);
                Ok(())
            }
            UnmatchedLines::Warn => {
                warn!("{}:{}: skipped {:?}: {}", self.source, line_no, line, err);
                Ok(())
            }
            UnmatchedLines::Reject => Err(RbacError::Parse {
                file: self.source.clone(),
                line: line_no,
                text: line.to_string(),
            }),
        }
    }
}

fn parse_user_line(caps: &Captures<'_>) -> Vec<User> {
    let groups: Vec<Group> = parse_list(&caps["groups"])
        .into_iter()
        .map(Group::new)
        .collect();
    parse_list(&caps["user"])
        .into_iter()
        .map(|name| User::new(name).with_groups(groups.iter().cloned()))
        .collect()
}

fn parse_membership_line(caps: &Captures<'_>) -> Vec<Membership> {
    let role = Role::new(&caps["role"]);
    parse_list(&caps["members"])
        .into_iter()
        .map(|member| Membership {
            role: role.clone(),
            member: parse_member(member),
        })
        .collect()
}

/// `@name` is a user, anything else a group.
fn parse_member(member: &str) -> Identity {
    match member.strip_prefix('@') {
        Some(name) => User::new(name).into(),
        None => Group::new(member).into(),
    }
}

fn parse_list(field: &str) -> Vec<&str> {
    field
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Strip a `#` comment and surrounding whitespace.
fn trim_line(line: &str) -> &str {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    line.trim()
}
