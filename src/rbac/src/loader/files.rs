//! Builds domains from the global files and the cascading rule files

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::text::TextLoader;
use super::walker::{FileSystemLoader, FsRuleFileSource, RuleFileSource};
use crate::cache::RuleFileCache;
use crate::config::RbacConfig;
use crate::domain::{Domain, IdentityDomain, PasswordDomain, RoleDomain, RuleDomain};
use crate::error::{RbacError, Result};
use crate::identity::Group;
use crate::pattern::Role;

/// Loads the user, membership and password files and the rule files of
/// one resource. The global files must exist; rule files are optional.
pub struct DomainFileLoader {
    config: RbacConfig,
    source: Arc<dyn RuleFileSource>,
    cache: Option<Arc<RuleFileCache>>,
    files_loaded: Vec<PathBuf>,
}

impl DomainFileLoader {
    pub fn new(config: RbacConfig) -> Self {
        Self {
            config,
            source: Arc::new(FsRuleFileSource),
            cache: None,
            files_loaded: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn RuleFileSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_cache(mut self, cache: Option<Arc<RuleFileCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Every file read so far, in read order
    pub fn files_loaded(&self) -> &[PathBuf] {
        &self.files_loaded
    }

    /// Users, plus the distinct groups they name sorted by name.
    pub fn load_user_file(&mut self, path: &Path) -> Result<IdentityDomain> {
        let text = self.read_required(path)?;
        let users = self.text_loader(path).read_users(&text)?;

        let groups: BTreeMap<&str, &Group> = users
            .iter()
            .flat_map(|user| user.groups.iter())
            .map(|group| (group.name.as_str(), group))
            .collect();
        let groups = groups.into_values().cloned().collect();

        Ok(IdentityDomain::new(users, groups))
    }

    /// Memberships, plus the distinct roles they name sorted by name.
    pub fn load_membership_file(&mut self, path: &Path) -> Result<RoleDomain> {
        let text = self.read_required(path)?;
        let memberships = self.text_loader(path).read_memberships(&text)?;

        let roles: BTreeMap<&str, &Role> = memberships
            .iter()
            .map(|membership| (membership.role.name.as_str(), &membership.role))
            .collect();
        let roles = roles.into_values().cloned().collect();

        Ok(RoleDomain::new(memberships, roles))
    }

    pub fn load_password_file(&mut self, path: &Path) -> Result<PasswordDomain> {
        let text = self.read_required(path)?;
        let passwords = self.text_loader(path).read_passwords(&text)?;
        Ok(PasswordDomain::new(passwords))
    }

    /// Cascaded rules for `resource`, nearest directory first.
    pub fn load_rules_for_resource(&mut self, resource: &str) -> Result<RuleDomain> {
        let mut walker = FileSystemLoader::new(&self.config.resource_root)
            .with_rule_file_name(&self.config.rule_file_name)
            .with_unmatched(self.config.unmatched_lines)
            .with_source(Arc::clone(&self.source))
            .with_cache(self.cache.clone());
        let rules = walker.load_rules(resource)?;
        self.files_loaded.extend_from_slice(walker.files_loaded());
        Ok(RuleDomain::new(rules))
    }

    /// Everything needed to decide on `resource`.
    pub fn domain(&mut self, resource: &str) -> Result<Domain> {
        let identity_domain = self.load_user_file(&self.config.user_file())?;
        let password_domain = self.load_password_file(&self.config.password_file())?;
        self.domain_with(identity_domain, password_domain, resource)
    }

    /// Complete a domain around identity and password data already loaded.
    pub fn domain_with(
        &mut self,
        identity_domain: IdentityDomain,
        password_domain: PasswordDomain,
        resource: &str,
    ) -> Result<Domain> {
        let role_domain = self.load_membership_file(&self.config.membership_file())?;
        let rule_domain = self.load_rules_for_resource(resource)?;
        Ok(Domain {
            identity_domain,
            role_domain,
            rule_domain,
            password_domain,
        })
    }

    fn read_required(&mut self, path: &Path) -> Result<String> {
        let text = std::fs::read_to_string(path).map_err(|e| RbacError::io(path, e))?;
        debug!("loaded {}", path.display());
        self.files_loaded.push(path.to_path_buf());
        Ok(text)
    }

    fn text_loader(&self, path: &Path) -> TextLoader {
        TextLoader::new()
            .with_source(path.display().to_string())
            .with_unmatched(self.config.unmatched_lines)
    }
}
