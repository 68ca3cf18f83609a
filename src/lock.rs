//! Topology lockfile.
//!
//! `fetch_topologies` records what it actually materialized, keyed by
//! topology name, so drift between the manifest and the cache is
//! detectable. The lockfile is TOML at `<cityRoot>/.gc/topology.lock`;
//! a missing file reads as an empty lock.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// One pinned topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockEntry {
    pub source: String,

    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// The commit the cache worktree sits on.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,

    /// `sha256:`-prefixed recursive content hash of the topology root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
}

/// The whole lockfile: `[topologies.<name>]` tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyLock {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub topologies: BTreeMap<String, LockEntry>,
}

impl TopologyLock {
    /// Names whose `(source, ref, commit)` differ between two locks,
    /// including names present on only one side. Sorted.
    pub fn diff(&self, other: &TopologyLock) -> Vec<String> {
        let mut changed: Vec<String> = Vec::new();
        for (name, entry) in &self.topologies {
            match other.topologies.get(name) {
                Some(o)
                    if o.source == entry.source
                        && o.reference == entry.reference
                        && o.commit == entry.commit => {}
                _ => changed.push(name.clone()),
            }
        }
        for name in other.topologies.keys() {
            if !self.topologies.contains_key(name) {
                changed.push(name.clone());
            }
        }
        changed.sort();
        changed.dedup();
        changed
    }
}

/// Path of the lockfile under a city root.
pub fn lock_path(city_root: &Path) -> PathBuf {
    city_root.join(".gc").join("topology.lock")
}

/// Read a lockfile. Missing file parses to an empty lock.
pub fn read_lock(path: &Path) -> Result<TopologyLock, ConfigError> {
    if !path.exists() {
        return Ok(TopologyLock::default());
    }
    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    toml::from_str(&text).map_err(|e| ConfigError::parse(path, e))
}

/// Write a lockfile, creating parent directories as needed.
pub fn write_lock(path: &Path, lock: &TopologyLock) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }
    let text = toml::to_string_pretty(lock)
        .expect("lockfile serialization cannot fail");
    fs::write(path, text).map_err(|e| ConfigError::io(path, e))
}
