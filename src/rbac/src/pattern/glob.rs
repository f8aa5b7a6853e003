//! Glob to regex compilation for rule patterns
//!
//! Supported glob syntax:
//!
//! | glob                         | regex             | notes                                    |
//! |------------------------------|-------------------|------------------------------------------|
//! | `.`                          | `\.`              | literal dot                              |
//! | `?`                          | `[^/.]`           | one char, not `/` or `.`                 |
//! | `**`                         | `[^./].*`         | one or more chars, not starting `.`/`/`  |
//! | `*` at start or after `/`    | `(?:[^./][^/]*)?` | segment, may be empty, never hidden      |
//! | any other `*`                | `[^/]*`           | rest of a segment, may be empty          |
//!
//! When a segment-leading `*` is directly followed by `.` or `/` it must
//! consume at least one character, so `*.c` never matches `.c`. Every
//! other character matches itself literally and the result is anchored.

use crate::error::{RbacError, Result};
use regex::Regex;
use std::fmt;

const STAR_STAR: &str = "[^./].*";
const SEGMENT_STAR: &str = "[^/]*";
const LEADING_STAR: &str = "(?:[^./][^/]*)?";
const LEADING_STAR_NONEMPTY: &str = "[^./][^/]*";
const ONE_CHAR: &str = "[^/.]";

/// A glob compiled to an anchored regex
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    glob: String,
    regex: Regex,
}

impl CompiledPattern {
    /// The glob this pattern was compiled from
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// The generated regex source
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.regex.as_str())
    }
}

/// Compile a glob into an anchored regex.
///
/// # Examples
///
/// ```rust
/// use htrbac::pattern::glob_to_regex;
///
/// let pattern = glob_to_regex("**/*.c").unwrap();
/// assert!(pattern.is_match("d/a.c"));
/// assert!(!pattern.is_match("a.c"));
/// ```
pub fn glob_to_regex(glob: &str) -> Result<CompiledPattern> {
    let chars: Vec<char> = glob.chars().collect();
    let mut source = String::with_capacity(glob.len() * 2 + 6);
    source.push_str("^(?:");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '.' => source.push_str(r"\."),
            '?' => source.push_str(ONE_CHAR),
            '*' if chars.get(i + 1) == Some(&'*') => {
                source.push_str(STAR_STAR);
                i += 1;
            }
            '*' if i == 0 || chars[i - 1] == '/' => match chars.get(i + 1) {
                Some('.') | Some('/') => source.push_str(LEADING_STAR_NONEMPTY),
                _ => source.push_str(LEADING_STAR),
            },
            '*' => source.push_str(SEGMENT_STAR),
            c => {
                let mut buf = [0u8; 4];
                source.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
        i += 1;
    }

    source.push_str(")$");

    let regex = Regex::new(&source)
        .map_err(|e| RbacError::InvalidPattern(format!("{glob:?}: {e}")))?;

    Ok(CompiledPattern {
        glob: glob.to_string(),
        regex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fut(glob: &str, path: &str) -> bool {
        glob_to_regex(glob).unwrap().is_match(path)
    }

    #[test]
    fn test_literal_path() {
        assert!(!fut("a/b", ""));
        assert!(!fut("a/b", "a"));
        assert!(fut("a/b", "a/b"));
        assert!(!fut("a/b", "a/bc"));
    }

    #[test]
    fn test_star() {
        assert!(fut("*.c", "a.c"));
        assert!(!fut("*.c", "b.b"));
        assert!(!fut("*.c", "d/a.c"));
        assert!(!fut("*.c", ".c"));
    }

    #[test]
    fn test_star_star() {
        assert!(fut("**", "a.c"));
        assert!(fut("**", "d/a.c"));
        assert!(fut("**", "d/e/a.c"));
        assert!(fut("**", "d/e/b"));
        assert!(!fut("**", ""));
        assert!(!fut("**", ".hidden"));

        assert!(!fut("**/*.c", "a.c"));
        assert!(fut("**/*.c", "d/a.c"));
        assert!(fut("**/*.c", "d/e/a.c"));
        assert!(!fut("**/*.c", "d/e/b"));

        assert!(!fut("/**", "a.c"));
        assert!(!fut("/**", "d/a.c"));
        assert!(fut("/**", "/a.c"));
        assert!(fut("/**", "/d/a.c"));
    }

    #[test]
    fn test_leading_star_may_be_empty() {
        assert!(fut("/a/*", "/a/"));
        assert!(fut("/a/*", "/a/2"));
        assert!(!fut("/a/*", "/a/.rbac.txt"));
        assert!(!fut("/a/*", "/a/b/2"));
        assert!(fut("/a/*x", "/a/x"));
    }

    #[test]
    fn test_inner_star() {
        assert!(fut("README.*", "README.md"));
        assert!(fut("README.*", "README."));
        assert!(fut("f*.txt", "f.txt"));
        assert!(fut("f*.txt", "f1.txt"));
        assert!(!fut("f*.txt", "f/1.txt"));
    }

    #[test]
    fn test_question_mark() {
        assert!(fut("a?c", "abc"));
        assert!(!fut("a?c", "a.c"));
        assert!(!fut("a?c", "a/c"));
        assert!(!fut("a?c", "ac"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(fut("/a+b/(x)", "/a+b/(x)"));
        assert!(!fut("/a+b", "/aab"));
        assert!(fut("[ab]", "[ab]"));
        assert!(!fut("[ab]", "a"));
    }

    #[test]
    fn test_generated_source() {
        let pattern = glob_to_regex("*.c").unwrap();
        assert_eq!(pattern.as_str(), r"^(?:[^./][^/]*\.c)$");
        assert_eq!(pattern.glob(), "*.c");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn literal_globs_match_only_themselves(path in "/[a-zA-Z0-9_+()\\[\\]-]{1,12}(/[a-zA-Z0-9_]{1,8}){0,3}") {
                let pattern = glob_to_regex(&path).unwrap();
                prop_assert!(pattern.is_match(&path));
                let longer = format!("{path}x");
                prop_assert!(!pattern.is_match(&longer));
            }

            #[test]
            fn double_star_never_matches_hidden(dir in "[a-z]{1,8}", name in "[a-z]{0,8}") {
                let pattern = glob_to_regex(&format!("/{dir}/**")).unwrap();
                let hidden = format!("/{dir}/.{name}");
                let visible = format!("/{dir}/v{name}");
                prop_assert!(!pattern.is_match(&hidden));
                prop_assert!(pattern.is_match(&visible));
            }
        }
    }
}
