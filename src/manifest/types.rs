//! Manifest Types
//!
//! Rust structs matching the component.json schema.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Manifest file name within a component directory.
pub const MANIFEST_FILE: &str = "component.json";

/// Default entry script when neither the caller nor the manifest names one.
pub const DEFAULT_MAIN: &str = "init.lua";

/// Parsed component manifest.
///
/// Fields unknown to the loader are collected into `extra` untouched; they
/// exist only for hook consumers (e.g. a `templates` list driving a
/// compile-to-script hook).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Declared script files, in order. This is an allow-list: a file not
    /// listed here cannot be loaded even if present on disk.
    #[serde(default)]
    pub scripts: Vec<String>,

    /// Default entry file.
    #[serde(default)]
    pub main: Option<String>,

    /// Production dependencies: `"repo/name"` -> version token. The token
    /// is kept for hook consumers but otherwise ignored.
    #[serde(default)]
    pub dependencies: HashMap<String, String>,

    /// Development dependencies, same shape, merged only in dev mode.
    #[serde(default)]
    pub development: HashMap<String, String>,

    /// Dependency names resolved as siblings under the same lookup root,
    /// without a repo qualifier.
    #[serde(default)]
    pub local: Vec<String>,

    /// Extra lookup directories, relative to the component directory.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Opaque extension fields for hook consumers.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Manifest {
    /// Map of requirable short names to qualified on-disk lookup names.
    ///
    /// A declared key `"repo/name"` qualifies to `"repo-name"`. Names listed
    /// under `local` stay bare and are applied last, so a local name shadows
    /// a qualified dependency of the same short name; the collision is
    /// logged rather than silently resolved.
    pub fn dependency_map(&self, dev: bool) -> HashMap<String, String> {
        let mut map = HashMap::new();

        let mut declared: Vec<&String> = self.dependencies.keys().collect();
        if dev {
            declared.extend(self.development.keys());
        }
        for key in declared {
            let (short, qualified) = match key.split_once('/') {
                Some((repo, name)) => (name.to_string(), format!("{repo}-{name}")),
                None => (key.clone(), key.clone()),
            };
            map.insert(short, qualified);
        }

        for name in &self.local {
            if let Some(previous) = map.insert(name.clone(), name.clone()) {
                if previous != *name {
                    warn!("local dependency \"{name}\" shadows qualified \"{previous}\"");
                }
            }
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Manifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn minimal_manifest_defaults() {
        let manifest = parse("{}");
        assert!(manifest.scripts.is_empty());
        assert!(manifest.main.is_none());
        assert!(manifest.dependency_map(true).is_empty());
    }

    #[test]
    fn qualifies_repo_names() {
        let manifest = parse(r#"{"dependencies": {"vendor/bar": "*"}}"#);
        let map = manifest.dependency_map(false);
        assert_eq!(map.get("bar"), Some(&"vendor-bar".to_string()));
    }

    #[test]
    fn development_requires_dev_mode() {
        let manifest = parse(r#"{"development": {"vendor/foo": "*"}}"#);
        assert!(manifest.dependency_map(false).get("foo").is_none());
        assert_eq!(
            manifest.dependency_map(true).get("foo"),
            Some(&"vendor-foo".to_string())
        );
    }

    #[test]
    fn local_names_stay_bare_and_win() {
        let manifest = parse(
            r#"{"dependencies": {"vendor/baz": "*"}, "local": ["baz"]}"#,
        );
        let map = manifest.dependency_map(false);
        assert_eq!(map.get("baz"), Some(&"baz".to_string()));
    }

    #[test]
    fn extension_fields_pass_through() {
        let manifest = parse(r#"{"scripts": ["init.lua"], "templates": ["t.html"]}"#);
        let templates = manifest.extra.get("templates").unwrap();
        assert_eq!(templates, &serde_json::json!(["t.html"]));
    }
}
