//! Manifest Loader
//!
//! Reads and parses a single component manifest from disk.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::types::{Manifest, MANIFEST_FILE};
use crate::error::{Error, Result};

/// Load the manifest of the component rooted at `dir`.
pub fn load_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);

    let content = fs::read_to_string(&path).map_err(|source| Error::ManifestRead {
        path: path.clone(),
        source,
    })?;

    let manifest: Manifest = serde_json::from_str(&content)
        .map_err(|source| Error::ManifestParse { path, source })?;

    debug!("loaded manifest of {}", dir.display());
    Ok(manifest)
}
