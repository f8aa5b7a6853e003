//! Entry points for the web boundary: `login` and `check_access`

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{Authenticator, Cipher};
use crate::cache::{RuleCacheStats, RuleFileCache};
use crate::config::RbacConfig;
use crate::domain::{Domain, IdentityDomain, PasswordDomain, Solver};
use crate::error::Result;
use crate::identity::{Cookie, UserPass};
use crate::loader::{DomainFileLoader, FsRuleFileSource, RuleFileSource};
use crate::path::clean_resource_path;
use crate::pattern::{Action, Resource};
use crate::rule::{Permission, Request, Rule};

/// The rule that decided a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRule {
    pub permission: Permission,
    pub action: String,
    pub role: String,
    pub resource: String,
    pub description: String,
}

/// Outcome of an access check, serialisable as the response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub permission: Permission,
    pub action: String,
    pub resource: String,
    /// Authenticated username; empty when nobody was authenticated
    pub user: String,
    pub rule: DecisionRule,
}

impl Decision {
    pub fn new(action: &str, resource: &str, username: &str, rule: &Rule) -> Self {
        Self {
            permission: rule.permission,
            action: action.to_string(),
            resource: resource.to_string(),
            user: username.to_string(),
            rule: DecisionRule {
                permission: rule.permission,
                action: rule.action.name.clone(),
                role: rule.role.name.clone(),
                resource: rule.resource.name.clone(),
                description: rule.description.clone(),
            },
        }
    }

    pub fn allowed(&self) -> bool {
        self.permission.is_allow()
    }
}

/// Access control facade
///
/// Every call re-reads the user, membership and password files and the
/// rule files governing the requested resource, so edits take effect on
/// the next request.
pub struct App {
    config: RbacConfig,
    cipher: Cipher,
    source: Arc<dyn RuleFileSource>,
    cache: Option<Arc<RuleFileCache>>,
}

impl App {
    pub fn new(config: RbacConfig) -> Result<Self> {
        config.validate()?;
        let cache = config.cache_rules.then(|| Arc::new(RuleFileCache::new()));
        Ok(Self {
            cipher: Cipher::new(&config.cipher_key),
            config,
            source: Arc::new(FsRuleFileSource),
            cache,
        })
    }

    /// Read rule files through `source` instead of the local filesystem.
    pub fn with_source(mut self, source: Arc<dyn RuleFileSource>) -> Self {
        self.source = source;
        self
    }

    pub fn config(&self) -> &RbacConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> Option<RuleCacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Verify a password and issue a session cookie.
    ///
    /// # Returns
    ///
    /// `None` for an unknown user or wrong password.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<Cookie>> {
        let authenticator = self.make_authenticator()?;
        let userpass = authenticator.auth_userpass(&UserPass::new(username, password));
        info!("login: username={:?} ok={}", username, userpass.is_some());
        userpass
            .map(|userpass| authenticator.userpass_cookie(&userpass))
            .transpose()
    }

    /// Decide whether the caller may perform `action` on `resource`.
    ///
    /// # Arguments
    ///
    /// * `action` - Action name, such as `GET`
    /// * `resource` - Resource path; cleaned and rooted at `/`
    /// * `auth_header` - Raw `Authorization` header, if any
    /// * `cookie` - Session cookie value or `Cookie` header, if any
    ///
    /// # Returns
    ///
    /// Whether access is allowed, and the decision that says why.
    /// Authentication failures are not errors; they end in a default deny.
    pub fn check_access(
        &self,
        action: &str,
        resource: &str,
        auth_header: Option<&str>,
        cookie: Option<&str>,
    ) -> Result<(bool, Decision)> {
        let authenticator = self.make_authenticator()?;
        let username = self.authenticate(&authenticator, auth_header, cookie);
        let (identity_domain, password_domain) = authenticator.into_domains();
        self.decide(action, resource, &username, identity_domain, password_domain)
    }

    /// Decide for an already authenticated `username`.
    pub fn is_allowed(&self, action: &str, resource: &str, username: &str) -> Result<(bool, Decision)> {
        let authenticator = self.make_authenticator()?;
        let (identity_domain, password_domain) = authenticator.into_domains();
        self.decide(action, resource, username, identity_domain, password_domain)
    }

    /// Cascaded rules for `resource`, nearest directory first.
    pub fn rules_for_resource(&self, resource: &str) -> Result<Vec<Rule>> {
        let resource = clean_resource_path(resource);
        Ok(self.loader().load_rules_for_resource(&resource)?.rules)
    }

    /// The rule deciding `action` on `resource` for `username` within
    /// `solver`'s domain. Falls back to a default deny.
    pub fn solve(&self, solver: &Solver, action: &str, resource: &str, username: &str) -> Rule {
        let domain = solver.domain();
        let user = domain.user_for_name(username).cloned();
        let request = Request::new(Resource::new(resource), Action::new(action), user);

        let rules: Vec<&Rule> = if action.is_empty() || username.is_empty() || request.user.is_none() {
            Vec::new()
        } else {
            solver.find_rules(&request, None)
        };

        if self.config.verbose {
            log_solve_trace(domain, &request, &rules);
        }

        match rules.first() {
            Some(rule) => (*rule).clone(),
            None => Rule::default_deny(&request),
        }
    }

    /// Authenticator over freshly loaded user and password files
    pub fn make_authenticator(&self) -> Result<Authenticator> {
        let mut loader = self.loader();
        let identity_domain = loader.load_user_file(&self.config.user_file())?;
        let password_domain = loader.load_password_file(&self.config.password_file())?;
        Ok(Authenticator::new(
            identity_domain,
            password_domain,
            self.cipher.clone(),
            &self.config.cookie_name,
        ))
    }

    /// Domain for `resource` around identity and password data already loaded
    pub fn make_domain(
        &self,
        identity_domain: IdentityDomain,
        password_domain: PasswordDomain,
        resource: &str,
    ) -> Result<Domain> {
        let mut loader = self.loader();
        let domain = loader.domain_with(identity_domain, password_domain, resource)?;
        debug!("files loaded: {:?}", loader.files_loaded());
        Ok(domain)
    }

    fn authenticate(
        &self,
        authenticator: &Authenticator,
        auth_header: Option<&str>,
        cookie: Option<&str>,
    ) -> String {
        let userpass = authenticator.authenticate(None, auth_header, cookie);
        let username = userpass.map(|userpass| userpass.username).unwrap_or_default();
        info!("authenticate: username={:?}", username);
        username
    }

    fn decide(
        &self,
        action: &str,
        resource: &str,
        username: &str,
        identity_domain: IdentityDomain,
        password_domain: PasswordDomain,
    ) -> Result<(bool, Decision)> {
        let resource = clean_resource_path(resource);
        let domain = self.make_domain(identity_domain, password_domain, &resource)?;
        let solver = Solver::new(domain);

        let rule = self.solve(&solver, action, &resource, username);
        let decision = Decision::new(action, &resource, username, &rule);
        info!(
            "decision: {} {} {} user={:?} rule={}",
            decision.permission,
            decision.action,
            decision.resource,
            decision.user,
            rule.brief()
        );
        Ok((decision.allowed(), decision))
    }

    fn loader(&self) -> DomainFileLoader {
        DomainFileLoader::new(self.config.clone())
            .with_source(Arc::clone(&self.source))
            .with_cache(self.cache.clone())
    }
}

fn log_solve_trace(domain: &Domain, request: &Request, rules: &[&Rule]) {
    let user = request.user.as_ref();
    info!("  action        : {:?}", request.action.name);
    info!("  resource      : {:?}", request.resource.name);
    info!("  user          : {:?}", user.map(|u| &u.name));
    info!(
        "  groups        : {:?}",
        user.map(|u| u.groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>())
    );
    info!(
        "  roles         : {:?}",
        user.map(|u| {
            domain
                .roles_for_user(u)
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
        })
    );
    info!("  rules         : {}", rules.len());
    for rule in rules {
        info!("                : {}", rule.brief());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn app() -> (TempDir, App) {
        let tmp = TempDir::new().unwrap();
        let domain_root = tmp.path().join("domain");
        let resource_root = tmp.path().join("resource");
        fs::create_dir_all(&domain_root).unwrap();
        fs::create_dir_all(&resource_root).unwrap();
        fs::write(domain_root.join("user.txt"), "user bob staff\n").unwrap();
        fs::write(domain_root.join("role.txt"), "member reader staff\n").unwrap();
        fs::write(domain_root.join("password.txt"), "password bob b0b3r7\n").unwrap();
        fs::write(resource_root.join(".rbac.txt"), "rule allow GET reader *\n").unwrap();
        let mut config = RbacConfig::new(resource_root, domain_root);
        config.verbose = true;
        (tmp, App::new(config).unwrap())
    }

    #[test]
    fn test_is_allowed() {
        let (_tmp, app) = app();
        let (allowed, decision) = app.is_allowed("GET", "/x.txt", "bob").unwrap();
        assert!(allowed);
        assert_eq!(decision.rule.role, "reader");
        assert_eq!(decision.rule.resource, "/*");

        let (allowed, decision) = app.is_allowed("PUT", "/x.txt", "bob").unwrap();
        assert!(!allowed);
        assert_eq!(decision.rule.description, "<<DEFAULT>>");
    }

    #[test]
    fn test_empty_action_or_user_denied() {
        let (_tmp, app) = app();
        assert!(!app.is_allowed("", "/x.txt", "bob").unwrap().0);
        assert!(!app.is_allowed("GET", "/x.txt", "").unwrap().0);
        assert!(!app.is_allowed("GET", "/x.txt", "mallory").unwrap().0);
    }

    #[test]
    fn test_request_path_is_cleaned() {
        let (_tmp, app) = app();
        let (allowed, decision) = app.is_allowed("GET", "a/../x.txt", "bob").unwrap();
        assert!(allowed);
        assert_eq!(decision.resource, "/x.txt");
    }

    #[test]
    fn test_decision_json() {
        let (_tmp, app) = app();
        let (_, decision) = app.is_allowed("GET", "/x.txt", "bob").unwrap();
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["permission"], "allow");
        assert_eq!(json["user"], "bob");
        assert_eq!(json["rule"]["action"], "GET");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RbacConfig::new("r", "d");
        config.cookie_name = String::new();
        assert!(App::new(config).is_err());
    }
}
