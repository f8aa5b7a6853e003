//! Engine configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RbacError, Result};
pub use crate::loader::UnmatchedLines;

pub const DEFAULT_RULE_FILE_NAME: &str = ".rbac.txt";
pub const DEFAULT_COOKIE_NAME: &str = "authsession";
pub const DEFAULT_CIPHER_KEY: &str = "123";

pub const USER_FILE: &str = "user.txt";
pub const MEMBERSHIP_FILE: &str = "role.txt";
pub const PASSWORD_FILE: &str = "password.txt";

/// Engine configuration
///
/// ```toml
/// resource_root = "/srv/www"
/// domain_root = "/etc/htrbac"
/// cookie_name = "authsession"
/// cipher_key = "change me"
/// unmatched_lines = "warn"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RbacConfig {
    /// Mirror of the resource tree holding one rule file per directory
    pub resource_root: PathBuf,
    /// Directory holding `user.txt`, `role.txt` and `password.txt`
    pub domain_root: PathBuf,
    #[serde(default = "default_rule_file_name")]
    pub rule_file_name: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cipher_key")]
    pub cipher_key: String,
    #[serde(default)]
    pub unmatched_lines: UnmatchedLines,
    /// Reuse parsed rule files while their mtime is unchanged
    #[serde(default)]
    pub cache_rules: bool,
    /// Log the full solve trace for every decision
    #[serde(default)]
    pub verbose: bool,
}

fn default_rule_file_name() -> String { DEFAULT_RULE_FILE_NAME.to_string() }
fn default_cookie_name() -> String { DEFAULT_COOKIE_NAME.to_string() }
fn default_cipher_key() -> String { DEFAULT_CIPHER_KEY.to_string() }

impl RbacConfig {
    pub fn new(resource_root: impl Into<PathBuf>, domain_root: impl Into<PathBuf>) -> Self {
        Self {
            resource_root: resource_root.into(),
            domain_root: domain_root.into(),
            rule_file_name: default_rule_file_name(),
            cookie_name: default_cookie_name(),
            cipher_key: default_cipher_key(),
            unmatched_lines: UnmatchedLines::default(),
            cache_rules: false,
            verbose: false,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| RbacError::io(path, e))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| RbacError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.rule_file_name.is_empty() {
            return Err(RbacError::Config("rule_file_name must not be empty".to_string()));
        }
        if self.rule_file_name.contains('/') {
            return Err(RbacError::Config(format!(
                "rule_file_name must be a plain file name: {:?}",
                self.rule_file_name
            )));
        }
        if self.cookie_name.is_empty() {
            return Err(RbacError::Config("cookie_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn user_file(&self) -> PathBuf {
        self.domain_root.join(USER_FILE)
    }

    pub fn membership_file(&self) -> PathBuf {
        self.domain_root.join(MEMBERSHIP_FILE)
    }

    pub fn password_file(&self) -> PathBuf {
        self.domain_root.join(PASSWORD_FILE)
    }
}
