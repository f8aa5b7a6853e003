//! Identity, role, rule and password domains, and the solver over them
//!
//! A [`Domain`] is a snapshot built for one decision. Nothing in it is
//! mutated after construction.

use crate::identity::{Group, Identity, Password, User};
use crate::pattern::Role;
use crate::rule::{Membership, Request, Rule};
use tracing::debug;

/// Users and groups
#[derive(Debug, Clone, Default)]
pub struct IdentityDomain {
    pub users: Vec<User>,
    /// Deduplicated, sorted by name
    pub groups: Vec<Group>,
}

impl IdentityDomain {
    pub fn new(users: Vec<User>, groups: Vec<Group>) -> Self {
        Self { users, groups }
    }

    /// First user named `name`
    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|user| user.name == name)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Groups of the user named `name`; empty for an unknown user
    pub fn groups_for_user(&self, name: &str) -> &[Group] {
        self.user_by_name(name)
            .map(|user| user.groups.as_slice())
            .unwrap_or(&[])
    }
}

/// Role memberships
#[derive(Debug, Clone, Default)]
pub struct RoleDomain {
    pub memberships: Vec<Membership>,
    /// Deduplicated, sorted by name
    pub roles: Vec<Role>,
}

impl RoleDomain {
    pub fn new(memberships: Vec<Membership>, roles: Vec<Role>) -> Self {
        Self { memberships, roles }
    }

    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|role| role.name == name)
    }

    /// Memberships whose member is `identity` (same kind, same name)
    pub fn memberships_for_identity(
        &self,
        identity: &Identity,
    ) -> impl Iterator<Item = &Membership> {
        let identity = identity.clone();
        self.memberships
            .iter()
            .filter(move |membership| membership.member.is_same(&identity))
    }

    /// Roles held by `user` directly plus those held through its groups.
    ///
    /// Order follows the membership file; duplicates are kept.
    pub fn roles_for_user(&self, user: &User) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self
            .memberships_for_identity(&Identity::User(user.clone()))
            .map(|membership| &membership.role)
            .collect();
        for group in &user.groups {
            roles.extend(self.roles_for_group(group));
        }
        roles
    }

    pub fn roles_for_group(&self, group: &Group) -> Vec<&Role> {
        self.memberships_for_identity(&Identity::Group(group.clone()))
            .map(|membership| &membership.role)
            .collect()
    }
}

/// The rules governing the requested resource, nearest directory first
#[derive(Debug, Clone, Default)]
pub struct RuleDomain {
    pub rules: Vec<Rule>,
}

impl RuleDomain {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Rules matching `request` and any of `roles`, in rule order.
    ///
    /// # Arguments
    ///
    /// * `request` - Resource and action being asked about
    /// * `roles` - Roles held by the requesting user
    /// * `max_rules` - Stop after this many matches (`None` for all)
    pub fn find_rules<'a>(
        &'a self,
        request: &Request,
        roles: &[&Role],
        max_rules: Option<usize>,
    ) -> Vec<&'a Rule> {
        let limit = max_rules.unwrap_or(usize::MAX);
        let mut found = Vec::new();
        if limit == 0 {
            return found;
        }
        for rule in &self.rules {
            if rule_matches(rule, request, roles) {
                found.push(rule);
                if found.len() >= limit {
                    break;
                }
            }
        }
        found
    }
}

/// Action first, then resource, then any role.
pub fn rule_matches(rule: &Rule, request: &Request, roles: &[&Role]) -> bool {
    rule.action.matches(&request.action)
        && rule.resource.matches(&request.resource)
        && roles.iter().any(|role| rule.role.matches(role))
}

/// Stored passwords
#[derive(Clone, Default)]
pub struct PasswordDomain {
    pub passwords: Vec<Password>,
}

impl PasswordDomain {
    pub fn new(passwords: Vec<Password>) -> Self {
        Self { passwords }
    }

    /// First password record for `name`
    pub fn password_for_name(&self, name: &str) -> Option<&Password> {
        self.passwords.iter().find(|password| password.name == name)
    }
}

impl std::fmt::Debug for PasswordDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordDomain")
            .field("passwords", &self.passwords.len())
            .finish()
    }
}

/// Everything needed to decide one request
#[derive(Debug, Clone, Default)]
pub struct Domain {
    pub identity_domain: IdentityDomain,
    pub role_domain: RoleDomain,
    pub rule_domain: RuleDomain,
    pub password_domain: PasswordDomain,
}

impl Domain {
    pub fn user_for_name(&self, name: &str) -> Option<&User> {
        self.identity_domain.user_by_name(name)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.identity_domain.group_by_name(name)
    }

    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.role_domain.role_by_name(name)
    }

    pub fn password_for_user(&self, user: &User) -> Option<&Password> {
        self.password_domain.password_for_name(&user.name)
    }

    pub fn roles_for_user(&self, user: &User) -> Vec<&Role> {
        self.role_domain.roles_for_user(user)
    }

    /// Matching rules for the request's user; none when there is no user.
    pub fn find_rules(&self, request: &Request, max_rules: Option<usize>) -> Vec<&Rule> {
        let Some(user) = &request.user else {
            return Vec::new();
        };
        let roles = self.roles_for_user(user);
        debug!(
            "roles for {}: {:?}",
            user.name,
            roles.iter().map(|role| role.name.as_str()).collect::<Vec<_>>()
        );
        self.rule_domain.find_rules(request, &roles, max_rules)
    }
}

/// Answers rule queries against a [`Domain`]
#[derive(Debug, Clone)]
pub struct Solver {
    domain: Domain,
}

impl Solver {
    pub fn new(domain: Domain) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Rules that match `request`, in first-match order.
    pub fn find_rules(&self, request: &Request, max_rules: Option<usize>) -> Vec<&Rule> {
        self.domain.find_rules(request, max_rules)
    }

    /// The rule deciding `request`: the first match, if any.
    pub fn first_rule(&self, request: &Request) -> Option<&Rule> {
        self.find_rules(request, Some(1)).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TextLoader;
    use crate::pattern::{Action, Resource};
    use crate::rule::Permission;

    fn domain(users: &str, members: &str, rules: &str) -> Domain {
        let loader = TextLoader::new();
        Domain {
            identity_domain: IdentityDomain::new(loader.read_users(users).unwrap(), Vec::new()),
            role_domain: RoleDomain::new(loader.read_memberships(members).unwrap(), Vec::new()),
            rule_domain: RuleDomain::new(loader.with_prefix("/").read_rules(rules).unwrap()),
            password_domain: PasswordDomain::default(),
        }
    }

    fn request(domain: &Domain, user: &str, action: &str, resource: &str) -> Request {
        Request::new(
            Resource::new(resource),
            Action::new(action),
            domain.user_for_name(user).cloned(),
        )
    }

    #[test]
    fn test_roles_direct_and_through_groups() {
        let d = domain(
            "user alice admins\nuser bob staff\n",
            "member editor @alice\nmember admin admins\nmember reader staff,@alice\n",
            "",
        );
        let alice = d.user_for_name("alice").unwrap();
        let names: Vec<_> = d.roles_for_user(alice).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["editor", "reader", "admin"]);

        let bob = d.user_for_name("bob").unwrap();
        let names: Vec<_> = d.roles_for_user(bob).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["reader"]);
    }

    #[test]
    fn test_user_and_group_with_same_name_are_distinct() {
        let d = domain("user ops nobody\n", "member admin ops\n", "");
        let ops = d.user_for_name("ops").unwrap();
        assert!(d.roles_for_user(ops).is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let d = domain(
            "user alice staff\n",
            "member reader staff\n",
            "rule deny GET reader secret.txt\nrule allow GET reader *\nrule allow * * *\n",
        );
        let solver = Solver::new(d);

        let req = request(solver.domain(), "alice", "GET", "/secret.txt");
        assert_eq!(solver.first_rule(&req).unwrap().permission, Permission::Deny);
        assert_eq!(solver.find_rules(&req, None).len(), 3);
        assert_eq!(solver.find_rules(&req, Some(2)).len(), 2);
        assert!(solver.find_rules(&req, Some(0)).is_empty());

        let req = request(solver.domain(), "alice", "GET", "/public.txt");
        assert_eq!(solver.first_rule(&req).unwrap().permission, Permission::Allow);
    }

    #[test]
    fn test_no_user_no_rules() {
        let d = domain("", "", "rule allow * * *\n");
        let req = request(&d, "mallory", "GET", "/x");
        assert!(req.user.is_none());
        assert!(d.find_rules(&req, None).is_empty());
    }

    #[test]
    fn test_role_pattern_and_action_mismatch() {
        let d = domain(
            "user alice staff\n",
            "member team-red staff\n",
            "rule allow PUT team-* *\n",
        );
        let solver = Solver::new(d);
        let get = request(solver.domain(), "alice", "GET", "/x");
        assert!(solver.first_rule(&get).is_none());
        let put = request(solver.domain(), "alice", "PUT", "/x");
        assert!(solver.first_rule(&put).is_some());
    }

    #[test]
    fn test_user_without_roles_matches_nothing() {
        let d = domain("user carol nobody\n", "", "rule allow * * *\n");
        let req = request(&d, "carol", "GET", "/x");
        assert!(d.find_rules(&req, None).is_empty());
    }
}
