//! Deterministic revision hashing.
//!
//! The revision digest folds every contributing source file plus every
//! rig topology tree into one SHA-256 stream, with sorted paths and NUL
//! delimiters so identical input trees always produce identical hex
//! digests. Callers use the digest as a content-addressed revision id.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CityConfig;
use crate::error::ConfigError;
use crate::expand::{effective_rig_topologies, resolve_topology_ref};
use crate::provenance::Provenance;

/// Number of hex characters shown when a revision is displayed short.
pub const SHORT_HASH_LEN: usize = 8;

/// The first [`SHORT_HASH_LEN`] characters of a full digest.
pub fn short_hash(full_hash: &str) -> &str {
    &full_hash[..full_hash.len().min(SHORT_HASH_LEN)]
}

/// Recursive content hash of a directory: sorted root-relative file
/// paths, each contributing `path NUL content NUL`. `.git` trees are
/// excluded; a missing directory hashes as empty.
pub fn hash_dir(dir: &Path) -> Result<String, ConfigError> {
    let mut hasher = Sha256::new();
    for (rel, path) in sorted_files(dir)? {
        let contents = fs::read(&path).map_err(|e| ConfigError::io(&path, e))?;
        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        hasher.update(&contents);
        hasher.update([0u8]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn sorted_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, ConfigError> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            match e.into_io_error() {
                Some(io) => ConfigError::io(path, io),
                None => ConfigError::io(path, std::io::Error::other("walk failed")),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        files.push((rel, entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Compute the revision digest over every provenance source and every
/// rig topology tree.
pub fn revision(
    prov: &Provenance,
    cfg: &CityConfig,
    city_root: &Path,
) -> Result<String, ConfigError> {
    let mut sources: Vec<PathBuf> = prov.sources.clone();
    sources.sort();

    let mut hasher = Sha256::new();
    for path in &sources {
        let contents = fs::read(path).map_err(|e| ConfigError::io(path, e))?;
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(&contents);
        hasher.update([0u8]);
    }

    for rig in &cfg.rigs {
        for reference in effective_rig_topologies(rig) {
            let dir = resolve_topology_ref(&cfg.topologies, city_root, &reference);
            let content_hash = hash_dir(&dir)?;
            hasher.update(b"topo:");
            hasher.update(rig.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(content_hash.as_bytes());
            hasher.update([0u8]);
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// The deduplicated, sorted set of directories a watcher should observe:
/// the parent of every source file plus every topology root.
pub fn watch_dirs(prov: &Provenance, cfg: &CityConfig, city_root: &Path) -> Vec<PathBuf> {
    let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
    for source in &prov.sources {
        if let Some(parent) = source.parent() {
            dirs.insert(parent.to_path_buf());
        }
    }
    for dir in &cfg.topology_dirs {
        dirs.insert(dir.clone());
    }
    for rig in &cfg.rigs {
        for reference in effective_rig_topologies(rig) {
            dirs.insert(resolve_topology_ref(&cfg.topologies, city_root, &reference));
        }
    }
    dirs.into_iter().collect()
}
