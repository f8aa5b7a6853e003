//! Shared fixture: a domain root and a resource tree in a temp directory

#![allow(dead_code)]

use htrbac::{App, RbacConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const USERS: &str = "\
# name   groups
user alice eng
user bob ops,eng
user carol nobody
";

pub const MEMBERS: &str = "\
member roleX eng
member admin @bob
";

pub const PASSWORDS: &str = "\
password alice a11ce
password bob b0b3r7
";

pub struct Fixture {
    pub tmp: TempDir,
    pub config: RbacConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let domain_root = tmp.path().join("domain");
        let resource_root = tmp.path().join("resource");
        fs::create_dir_all(&domain_root).unwrap();
        fs::create_dir_all(&resource_root).unwrap();
        fs::write(domain_root.join("user.txt"), USERS).unwrap();
        fs::write(domain_root.join("role.txt"), MEMBERS).unwrap();
        fs::write(domain_root.join("password.txt"), PASSWORDS).unwrap();
        let config = RbacConfig::new(resource_root, domain_root);
        Self { tmp, config }
    }

    /// Write the rule file for resource directory `dir` (e.g. `/a/b`).
    pub fn rules(&self, dir: &str, text: &str) -> PathBuf {
        let dir = self.config.resource_root.join(dir.trim_start_matches('/'));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".rbac.txt");
        fs::write(&path, text).unwrap();
        path
    }

    pub fn remove_rules(&self, dir: &str) {
        let path = self
            .config
            .resource_root
            .join(dir.trim_start_matches('/'))
            .join(".rbac.txt");
        fs::remove_file(path).unwrap();
    }

    pub fn domain_file(&self, name: &str) -> PathBuf {
        self.config.domain_root.join(name)
    }

    pub fn app(&self) -> App {
        App::new(self.config.clone()).unwrap()
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }
}
