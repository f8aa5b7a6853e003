//! POSIX resource path helpers

/// Normalize a POSIX path: collapse `//`, drop `.` segments and resolve
/// `..` against the preceding segment. `..` never climbs above the root
/// (or above the start of a relative path). A trailing `/` is kept.
pub fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let mut cleaned = String::with_capacity(path.len());
    if absolute {
        cleaned.push('/');
    }
    cleaned.push_str(&segments.join("/"));
    if trailing && !segments.is_empty() {
        cleaned.push('/');
    }
    cleaned
}

/// Clean a request path and root it at `/`.
pub fn clean_resource_path(path: &str) -> String {
    if path.starts_with('/') {
        clean_path(path)
    } else {
        clean_path(&format!("/{path}"))
    }
}

/// Ancestor directories of `path`, nearest first, ending with the root.
///
/// `/a/b/2` yields `["/a/b", "/a", "/"]`; `/` has no ancestors.
pub fn parent_dirs(path: &str) -> Vec<String> {
    let cleaned = clean_path(path);
    let mut current = cleaned.trim_end_matches('/');
    let mut dirs = Vec::new();

    while let Some(idx) = current.rfind('/') {
        if idx == 0 {
            dirs.push("/".to_string());
            break;
        }
        current = &current[..idx];
        dirs.push(current.to_string());
    }

    dirs
}

/// `prefix` for rules loaded from `dir`: the directory with a trailing `/`.
pub fn dir_prefix(dir: &str) -> String {
    if dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{dir}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/a//b"), "/a/b");
        assert_eq!(clean_path("/a/./b"), "/a/b");
        assert_eq!(clean_path("/a/b/../c"), "/a/c");
        assert_eq!(clean_path("/.."), "/");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path("./a"), "a");
        assert_eq!(clean_path("../a"), "a");
        assert_eq!(clean_path("a/.."), "");
        assert_eq!(clean_path("//"), "/");
        assert_eq!(clean_path("/a/b/"), "/a/b/");
        assert_eq!(clean_path("/a/b//*"), "/a/b/*");
    }

    #[test]
    fn test_clean_resource_path() {
        assert_eq!(clean_resource_path("a/f1.txt"), "/a/f1.txt");
        assert_eq!(clean_resource_path("/a/../f1.txt"), "/f1.txt");
    }

    #[test]
    fn test_parent_dirs_nearest_first() {
        assert_eq!(parent_dirs("/a/b/2"), vec!["/a/b", "/a", "/"]);
        assert_eq!(parent_dirs("/a"), vec!["/"]);
        assert_eq!(parent_dirs("/a/b/"), vec!["/a", "/"]);
        assert!(parent_dirs("/").is_empty());
    }

    #[test]
    fn test_dir_prefix() {
        assert_eq!(dir_prefix("/a/b"), "/a/b/");
        assert_eq!(dir_prefix("/"), "/");
    }
}
