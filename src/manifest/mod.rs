//! Component Manifests
//!
//! Parses and interprets the per-component `component.json` file: the
//! declared script allow-list, the default entry, and the dependency
//! declarations that drive name resolution.

pub mod loader;
pub mod types;

pub use loader::load_manifest;
pub use types::{Manifest, DEFAULT_MAIN, MANIFEST_FILE};
