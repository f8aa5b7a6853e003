//! Cascading rule file discovery
//!
//! Rules for a resource come from one rule file per ancestor directory,
//! nearest directory first:
//!
//! ```text
//! resource  /a/b/2
//! reads     ROOT/a/b/.rbac.txt   prefix /a/b/
//!           ROOT/a/.rbac.txt     prefix /a/
//!           ROOT/.rbac.txt       prefix /
//! ```
//!
//! A missing file contributes nothing. Since the solver returns the first
//! matching rule, rules in nearer directories take precedence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::text::{TextLoader, UnmatchedLines};
use crate::cache::{FileStamp, RuleFileCache};
use crate::error::{RbacError, Result};
use crate::path::{clean_resource_path, dir_prefix, parent_dirs};
use crate::rule::Rule;

/// Where rule file text comes from
pub trait RuleFileSource: Send + Sync {
    /// Contents of `path`, or `None` when no such file exists.
    fn read(&self, path: &Path) -> Result<Option<String>>;

    /// Modification time and length of `path`, or `None` when no such
    /// file exists or the source cannot tell.
    fn stamp(&self, _path: &Path) -> Result<Option<FileStamp>> {
        Ok(None)
    }
}

/// Reads rule files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRuleFileSource;

impl RuleFileSource for FsRuleFileSource {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if is_missing(&err) => Ok(None),
            Err(err) => Err(RbacError::io(path, err)),
        }
    }

    fn stamp(&self, path: &Path) -> Result<Option<FileStamp>> {
        let stamp = std::fs::metadata(path)
            .and_then(|meta| Ok(FileStamp::new(meta.modified()?, meta.len())));
        match stamp {
            Ok(stamp) => Ok(Some(stamp)),
            Err(err) if is_missing(&err) => Ok(None),
            Err(err) => Err(RbacError::io(path, err)),
        }
    }
}

/// `ENOENT`, or `ENOTDIR` when an ancestor of the rule file is a plain file
fn is_missing(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Collects the rules governing one resource
pub struct FileSystemLoader {
    resource_root: PathBuf,
    rule_file_name: String,
    unmatched: UnmatchedLines,
    source: Arc<dyn RuleFileSource>,
    cache: Option<Arc<RuleFileCache>>,
    files_loaded: Vec<PathBuf>,
}

impl FileSystemLoader {
    pub fn new(resource_root: impl Into<PathBuf>) -> Self {
        Self {
            resource_root: resource_root.into(),
            rule_file_name: crate::config::DEFAULT_RULE_FILE_NAME.to_string(),
            unmatched: UnmatchedLines::default(),
            source: Arc::new(FsRuleFileSource),
            cache: None,
            files_loaded: Vec::new(),
        }
    }

    pub fn with_rule_file_name(mut self, name: impl Into<String>) -> Self {
        self.rule_file_name = name.into();
        self
    }

    pub fn with_unmatched(mut self, unmatched: UnmatchedLines) -> Self {
        self.unmatched = unmatched;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn RuleFileSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_cache(mut self, cache: Option<Arc<RuleFileCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Rule files that existed and were read (or served from the cache)
    pub fn files_loaded(&self) -> &[PathBuf] {
        &self.files_loaded
    }

    /// All rules for `resource`, nearest directory first.
    ///
    /// # Arguments
    ///
    /// * `resource` - Resource path; relative paths are rooted at `/`
    ///
    /// # Returns
    ///
    /// The concatenated rules; empty when no rule file exists.
    pub fn load_rules(&mut self, resource: &str) -> Result<Vec<Rule>> {
        let resource = clean_resource_path(resource);
        let mut rules = Vec::new();
        for dir in parent_dirs(&resource) {
            rules.extend(self.load_rule_file(&dir)?.iter().cloned());
        }
        Ok(rules)
    }

    /// Path of the rule file for resource directory `dir`
    pub fn rule_file_path(&self, dir: &str) -> PathBuf {
        let relative = dir.trim_start_matches('/');
        let mut path = self.resource_root.clone();
        if !relative.is_empty() {
            path.push(relative);
        }
        path.push(&self.rule_file_name);
        path
    }

    fn load_rule_file(&mut self, dir: &str) -> Result<Arc<[Rule]>> {
        let path = self.rule_file_path(dir);

        let stamp = match &self.cache {
            Some(cache) => {
                let stamp = self.source.stamp(&path)?;
                match stamp {
                    Some(stamp) => {
                        if let Some(rules) = cache.get(&path, stamp) {
                            debug!("rule file (cached): {}", path.display());
                            self.files_loaded.push(path);
                            return Ok(rules);
                        }
                    }
                    None => cache.evict(&path),
                }
                stamp
            }
            None => None,
        };

        let Some(text) = self.source.read(&path)? else {
            return Ok(Arc::from(Vec::new()));
        };

        debug!("rule file: {}", path.display());
        let rules: Arc<[Rule]> = TextLoader::new()
            .with_prefix(dir_prefix(dir))
            .with_source(path.display().to_string())
            .with_unmatched(self.unmatched)
            .read_rules(&text)?
            .into();

        if let (Some(cache), Some(stamp)) = (&self.cache, stamp) {
            cache.insert(path.clone(), stamp, Arc::clone(&rules));
        }
        self.files_loaded.push(path);
        Ok(rules)
    }
}
