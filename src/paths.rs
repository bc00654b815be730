//! Path Utilities
//!
//! Lexical path helpers shared by lookup configuration, script resolution
//! and relative requires. All helpers operate on the path text alone; the
//! filesystem is never consulted.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

/// Normalize a manifest-relative script path.
///
/// Collapses `.` and `..` segments and canonicalizes the separator to `/`,
/// so manifest entries, hook-injected entries and require targets compare
/// equal regardless of how they were spelled.
pub(crate) fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(part) => {
                if let Some(part) = part.to_str() {
                    parts.push(part);
                }
            }
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.join("/")
}

/// Directory portion of a normalized script path (`""` for top-level files).
pub(crate) fn parent(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

/// Join a require target onto the requesting script's directory.
pub(crate) fn join_relative(base: &str, rel: &str) -> String {
    if base.is_empty() {
        normalize(rel)
    } else {
        normalize(&format!("{base}/{rel}"))
    }
}

/// Make `path` absolute against the current working directory, cleaning
/// redundant `.`/`..` segments lexically.
pub(crate) fn absolutize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(err) => {
                warn!("could not resolve working directory: {err}");
                path.to_path_buf()
            }
        }
    };
    clean(&absolute)
}

/// Lexically remove `.` segments and fold `..` into their parent.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_segments() {
        assert_eq!(normalize("./init.lua"), "init.lua");
        assert_eq!(normalize("lib/./util.lua"), "lib/util.lua");
        assert_eq!(normalize("lib/../init.lua"), "init.lua");
        assert_eq!(normalize("a/b/c"), "a/b/c");
    }

    #[test]
    fn parent_of_script_path() {
        assert_eq!(parent("init.lua"), "");
        assert_eq!(parent("lib/util.lua"), "lib");
        assert_eq!(parent("a/b/c.lua"), "a/b");
    }

    #[test]
    fn join_relative_requires() {
        assert_eq!(join_relative("", "./util"), "util");
        assert_eq!(join_relative("lib", "./helper"), "lib/helper");
        assert_eq!(join_relative("lib", "../top"), "top");
    }

    #[test]
    fn absolutize_relative_path() {
        let abs = absolutize(Path::new("some/dir"));
        assert!(abs.is_absolute());
        assert!(abs.ends_with("some/dir"));
    }

    #[test]
    fn clean_removes_dot_segments() {
        assert_eq!(clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
