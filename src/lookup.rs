//! Directory Lookup
//!
//! Ordered list of search directories. Given a name, returns the first
//! directory (by priority) whose listing contains it. Each directory's
//! listing is read once and cached.

use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Prioritized search directories with cached listings.
#[derive(Default)]
pub struct Lookup {
    paths: Vec<PathBuf>,
    listings: HashMap<PathBuf, HashSet<OsString>>,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a search directory (lowest priority so far).
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Search directories in priority order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Find `name` in the first directory that lists it.
    pub fn find(&mut self, name: &str) -> Option<PathBuf> {
        for i in 0..self.paths.len() {
            let dir = self.paths[i].clone();
            if self.listing(&dir).contains(OsStr::new(name)) {
                return Some(dir.join(name));
            }
        }
        None
    }

    fn listing(&mut self, dir: &Path) -> &HashSet<OsString> {
        if !self.listings.contains_key(dir) {
            let entries = read_listing(dir);
            self.listings.insert(dir.to_path_buf(), entries);
        }
        &self.listings[dir]
    }
}

/// Read a directory's entry names. A missing or unreadable directory yields
/// an empty listing so lookup proceeds to lower-priority paths.
fn read_listing(dir: &Path) -> HashSet<OsString> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.file_name()).collect(),
        Err(err) => {
            if err.kind() != ErrorKind::NotFound {
                warn!("could not list lookup directory {}: {err}", dir.display());
            }
            HashSet::new()
        }
    }
}
