//! Parsed rule file cache keyed by path, validated by file stamp

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::rule::Rule;

/// Modification time and length of a rule file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: SystemTime,
    pub len: u64,
}

impl FileStamp {
    pub fn new(modified: SystemTime, len: u64) -> Self {
        Self { modified, len }
    }
}

#[derive(Clone)]
struct CachedRules {
    stamp: FileStamp,
    rules: Arc<[Rule]>,
}

/// Cache of parsed rule files
///
/// Entries are reused only while the file's modification time and length
/// are both unchanged, so edits on disk are seen by the next decision even
/// when a copy preserves the mtime. Disabled unless `cache_rules` is set in
/// the config.
#[derive(Default)]
pub struct RuleFileCache {
    entries: DashMap<PathBuf, CachedRules>,
    stats: DashMap<&'static str, usize>,
}

impl RuleFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for `path` if cached with exactly `stamp`
    pub fn get(&self, path: &Path, stamp: FileStamp) -> Option<Arc<[Rule]>> {
        if let Some(entry) = self.entries.get(path) {
            if entry.stamp == stamp {
                self.increment_stat("hits");
                return Some(Arc::clone(&entry.rules));
            }
            drop(entry);
            self.entries.remove(path);
            self.increment_stat("invalidations");
        }

        self.increment_stat("misses");
        None
    }

    pub fn insert(&self, path: PathBuf, stamp: FileStamp, rules: Arc<[Rule]>) {
        self.entries.insert(path, CachedRules { stamp, rules });
    }

    /// Drop the entry for a file that no longer exists.
    pub fn evict(&self, path: &Path) {
        if self.entries.remove(path).is_some() {
            self.increment_stat("invalidations");
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.stats.clear();
    }

    pub fn stats(&self) -> RuleCacheStats {
        RuleCacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            invalidations: self.get_stat("invalidations"),
            entries: self.entries.len(),
        }
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
    pub entries: usize,
}

impl RuleCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TextLoader;
    use std::time::Duration;

    fn rules(text: &str) -> Arc<[Rule]> {
        TextLoader::new().read_rules(text).unwrap().into()
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = RuleFileCache::new();
        let path = PathBuf::from("/srv/a/.rbac.txt");
        let t0 = FileStamp::new(SystemTime::UNIX_EPOCH + Duration::from_secs(100), 17);

        assert!(cache.get(&path, t0).is_none());
        cache.insert(path.clone(), t0, rules("rule allow * * *\n"));

        let cached = cache.get(&path, t0).unwrap();
        assert_eq!(cached.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_modified_file_invalidates() {
        let cache = RuleFileCache::new();
        let path = PathBuf::from("/srv/.rbac.txt");
        let t0 = FileStamp::new(SystemTime::UNIX_EPOCH + Duration::from_secs(100), 17);
        let t1 = FileStamp::new(t0.modified + Duration::from_secs(1), 17);

        cache.insert(path.clone(), t0, rules("rule allow * * *\n"));
        assert!(cache.get(&path, t1).is_none());

        let stats = cache.stats();
        assert_eq!(stats.invalidations, 1);
        assert_eq!(stats.entries, 0);
    }

    #[test]
    fn test_resized_file_invalidates_at_same_mtime() {
        let cache = RuleFileCache::new();
        let path = PathBuf::from("/srv/.rbac.txt");
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(100);

        cache.insert(path.clone(), FileStamp::new(modified, 24), rules("rule allow * * *\n"));
        assert!(cache.get(&path, FileStamp::new(modified, 23)).is_none());
        assert_eq!(cache.stats().invalidations, 1);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_evict() {
        let cache = RuleFileCache::new();
        let path = PathBuf::from("/srv/.rbac.txt");
        cache.insert(path.clone(), FileStamp::new(SystemTime::UNIX_EPOCH, 0), rules(""));
        cache.evict(&path);
        cache.evict(&path);
        assert_eq!(cache.stats().invalidations, 1);
        assert_eq!(cache.stats().entries, 0);
    }
}
