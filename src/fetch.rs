//! Remote topology fetching and the on-disk cache.
//!
//! Named topologies clone into `<cityRoot>/.gc/topologies/<name>/`;
//! anonymous remote includes discovered inside topology files cache
//! under `.gc/topologies/_inc/<slug>-<hash12>/`. Git runs as a
//! subprocess with the inherited `GIT_*` environment scrubbed and
//! `core.hooksPath` cleared, so hooks from a surrounding repository
//! cannot touch the cache.

use anyhow::{Context, bail};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;
use tracing::debug;

use crate::config::{CityConfig, TopologySource};
use crate::error::ConfigError;
use crate::lock::{LockEntry, TopologyLock, lock_path, write_lock};
use crate::paths::resolve_config_path;

/// Environment variables removed from every git invocation. Leaking any
/// of these from a surrounding repository corrupts the cache.
pub const GIT_ENV_SCRUB: &[&str] = &[
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
];

/// A topology reference decomposed per the
/// `<source>[//subpath][#ref]` grammar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRef {
    pub source: String,
    pub subpath: Option<String>,
    pub reference: Option<String>,
}

/// True when a reference points at a git remote rather than the local
/// filesystem.
pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("git@")
        || reference.starts_with("ssh://")
        || reference.starts_with("https://")
        || reference.starts_with("http://")
}

/// Split a topology reference into source, optional subpath, and
/// optional ref. Local references pass through whole: a leading `//`
/// there is the root-relative marker, not a subpath separator.
///
/// GitHub tree URLs (`https://github.com/O/R/tree/REF[/PATH]`) are
/// normalized to a clone URL plus ref and subpath.
pub fn parse_source_ref(raw: &str) -> SourceRef {
    if !is_remote(raw) {
        return SourceRef {
            source: raw.to_string(),
            ..Default::default()
        };
    }

    let (rest, reference) = match raw.rsplit_once('#') {
        Some((rest, r)) if !r.is_empty() => (rest, Some(r.to_string())),
        Some((rest, _)) => (rest, None),
        None => (raw, None),
    };

    if let Some(tree) = parse_github_tree_url(rest) {
        return SourceRef {
            source: tree.source,
            subpath: tree.subpath,
            reference: reference.or(tree.reference),
        };
    }

    // Find `//` past the scheme's own `://` (or from the start for
    // scp-style git@host:path sources).
    let search_from = match rest.find("://") {
        Some(idx) => idx + 3,
        None => 0,
    };
    let (source, subpath) = match rest[search_from..].find("//") {
        Some(rel) => {
            let at = search_from + rel;
            (rest[..at].to_string(), Some(rest[at + 2..].to_string()))
        }
        None => (rest.to_string(), None),
    };

    SourceRef {
        source,
        subpath: subpath.filter(|s| !s.is_empty()),
        reference,
    }
}

fn parse_github_tree_url(url: &str) -> Option<SourceRef> {
    let rest = url.strip_prefix("https://github.com/")?;
    let mut parts = rest.splitn(4, '/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    if parts.next()? != "tree" {
        return None;
    }
    let ref_and_path = parts.next()?;
    let (reference, subpath) = match ref_and_path.split_once('/') {
        Some((r, p)) => (r, Some(p.to_string())),
        None => (ref_and_path, None),
    };
    if owner.is_empty() || repo.is_empty() || reference.is_empty() {
        return None;
    }
    Some(SourceRef {
        source: format!("https://github.com/{}/{}.git", owner, repo),
        subpath: subpath.filter(|p| !p.is_empty()),
        reference: Some(reference.to_string()),
    })
}

/// Clone target for a named topology.
pub fn topology_cache_path(city_root: &Path, name: &str) -> PathBuf {
    city_root.join(".gc").join("topologies").join(name)
}

/// Cache directory for an anonymous remote include:
/// `_inc/<slug>-<hash12>` where `slug` is the last URL component with
/// `.git` stripped and `hash12` the first 12 hex chars of
/// SHA-256(source URL).
pub fn include_cache_path(city_root: &Path, source_url: &str) -> PathBuf {
    let slug = source_slug(source_url);
    let digest = Sha256::digest(source_url.as_bytes());
    let hash12: String = format!("{:x}", digest).chars().take(12).collect();
    city_root
        .join(".gc")
        .join("topologies")
        .join("_inc")
        .join(format!("{}-{}", slug, hash12))
}

fn source_slug(source_url: &str) -> String {
    let last = source_url
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(source_url);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// The directory a named topology resolves to: the cache dir for remote
/// sources, the resolved local path otherwise, plus any subpath.
pub fn topology_source_dir(city_root: &Path, name: &str, spec: &TopologySource) -> PathBuf {
    let parsed = parse_source_ref(&spec.source);
    let subpath = spec.path.clone().or(parsed.subpath);
    let base = if is_remote(&parsed.source) {
        topology_cache_path(city_root, name)
    } else {
        resolve_config_path(&parsed.source, city_root, city_root)
    };
    match subpath {
        Some(p) if !p.is_empty() => base.join(p),
        _ => base,
    }
}

// ---------------------------------------------------------------------------
// Git subprocess plumbing
// ---------------------------------------------------------------------------

fn git(args: &[&str], cwd: Option<&Path>) -> anyhow::Result<Output> {
    let mut cmd = std::process::Command::new("git");
    cmd.arg("-c").arg("core.hooksPath=");
    for var in GIT_ENV_SCRUB {
        cmd.env_remove(var);
    }
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.output()
        .with_context(|| format!("running git {}", args.join(" ")))
}

fn git_ok(args: &[&str], cwd: Option<&Path>) -> anyhow::Result<String> {
    let out = git(args, cwd)?;
    if !out.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// The commit the worktree at `dir` sits on.
pub fn head_commit(dir: &Path) -> anyhow::Result<String> {
    git_ok(&["rev-parse", "HEAD"], Some(dir))
}

/// Make sure `dest` holds a checkout of `source` at `reference` (or the
/// default branch when no ref is given). Clones on first use, fetches
/// and resets afterwards.
pub fn ensure_fetched(dest: &Path, source: &str, reference: Option<&str>) -> anyhow::Result<()> {
    if dest.join(".git").exists() {
        update_checkout(dest, reference)
    } else {
        clone_into(dest, source, reference)
    }
}

fn clone_into(dest: &Path, source: &str, reference: Option<&str>) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating cache dir {}", parent.display()))?;
    }
    let dest_str = dest.to_string_lossy().into_owned();
    debug!(source, dest = %dest.display(), ?reference, "cloning topology");
    match reference {
        Some(r) => {
            // Branch and tag refs clone shallow directly; a raw commit
            // sha needs the full clone followed by a reset.
            let shallow = git(&["clone", "--depth", "1", "--branch", r, source, &dest_str], None)?;
            if shallow.status.success() {
                return Ok(());
            }
            git_ok(&["clone", source, &dest_str], None)?;
            let _ = git(&["fetch", "origin", r], Some(dest));
            reset_to_ref(dest, r)
        }
        None => {
            git_ok(&["clone", source, &dest_str], None)?;
            Ok(())
        }
    }
}

fn update_checkout(dest: &Path, reference: Option<&str>) -> anyhow::Result<()> {
    debug!(dest = %dest.display(), ?reference, "updating topology cache");
    git_ok(&["fetch", "--tags", "origin"], Some(dest))?;
    match reference {
        Some(r) => {
            let _ = git(&["fetch", "origin", r], Some(dest));
            reset_to_ref(dest, r)
        }
        None => {
            for candidate in ["origin/HEAD", "FETCH_HEAD"] {
                if git(&["reset", "--hard", candidate], Some(dest))?.status.success() {
                    return Ok(());
                }
            }
            bail!("no usable remote HEAD in {}", dest.display())
        }
    }
}

fn reset_to_ref(dest: &Path, reference: &str) -> anyhow::Result<()> {
    let remote_tracking = format!("origin/{}", reference);
    for candidate in [remote_tracking.as_str(), reference] {
        if git(&["reset", "--hard", candidate], Some(dest))?.status.success() {
            return Ok(());
        }
    }
    bail!("ref '{}' not found in {}", reference, dest.display())
}

// ---------------------------------------------------------------------------
// Fetch driver
// ---------------------------------------------------------------------------

/// Fetch every remote named topology into the cache and write the
/// lockfile. Local-path topologies are skipped (there is no commit to
/// pin). Returns the lock that was written.
pub fn fetch_topologies(cfg: &CityConfig, city_root: &Path) -> Result<TopologyLock, ConfigError> {
    let mut lock = TopologyLock::default();
    for (name, spec) in &cfg.topologies {
        let parsed = parse_source_ref(&spec.source);
        if !is_remote(&parsed.source) {
            continue;
        }
        let reference = spec.reference.clone().or(parsed.reference);
        let subpath = spec.path.clone().or(parsed.subpath);
        let dest = topology_cache_path(city_root, name);

        let fetch_err = |cause: anyhow::Error| ConfigError::TopologyFetch {
            name: name.clone(),
            url: spec.source.clone(),
            cause,
        };
        ensure_fetched(&dest, &parsed.source, reference.as_deref()).map_err(&fetch_err)?;
        let commit = head_commit(&dest).map_err(&fetch_err)?;

        let topology_root = match &subpath {
            Some(p) => dest.join(p),
            None => dest.clone(),
        };
        let hash = crate::revision::hash_dir(&topology_root)?;
        lock.topologies.insert(
            name.clone(),
            LockEntry {
                source: spec.source.clone(),
                reference,
                commit,
                hash: format!("sha256:{}", hash),
            },
        );
    }
    write_lock(&lock_path(city_root), &lock)?;
    Ok(lock)
}

/// Materialize an anonymous remote include (a raw URL reference inside a
/// topology file) into the `_inc` cache. Returns the topology directory,
/// subpath included.
pub fn ensure_include_cached(city_root: &Path, raw: &str) -> Result<PathBuf, ConfigError> {
    let parsed = parse_source_ref(raw);
    let dest = include_cache_path(city_root, &parsed.source);
    ensure_fetched(&dest, &parsed.source, parsed.reference.as_deref()).map_err(|cause| {
        ConfigError::TopologyFetch {
            name: source_slug(&parsed.source),
            url: raw.to_string(),
            cause,
        }
    })?;
    Ok(match parsed.subpath {
        Some(p) => dest.join(p),
        None => dest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_detection() {
        assert!(is_remote("git@github.com:example/topo.git"));
        assert!(is_remote("ssh://git@example.com/topo.git"));
        assert!(is_remote("https://github.com/example/topo.git"));
        assert!(is_remote("http://example.com/topo.git"));
        assert!(!is_remote("topologies/gt"));
        assert!(!is_remote("//topologies/gt"));
        assert!(!is_remote("/abs/path/topo"));
    }

    #[test]
    fn parse_plain_https() {
        let r = parse_source_ref("https://github.com/example/topo.git");
        assert_eq!(r.source, "https://github.com/example/topo.git");
        assert_eq!(r.subpath, None);
        assert_eq!(r.reference, None);
    }

    #[test]
    fn parse_subpath_and_ref() {
        let r = parse_source_ref("https://example.com/topo.git//bundles/gt#v2");
        assert_eq!(r.source, "https://example.com/topo.git");
        assert_eq!(r.subpath.as_deref(), Some("bundles/gt"));
        assert_eq!(r.reference.as_deref(), Some("v2"));
    }

    #[test]
    fn parse_scheme_slashes_not_subpath() {
        let r = parse_source_ref("https://example.com/topo.git#main");
        assert_eq!(r.source, "https://example.com/topo.git");
        assert_eq!(r.subpath, None);
        assert_eq!(r.reference.as_deref(), Some("main"));
    }

    #[test]
    fn parse_scp_style_subpath() {
        let r = parse_source_ref("git@example.com:topos.git//gt");
        assert_eq!(r.source, "git@example.com:topos.git");
        assert_eq!(r.subpath.as_deref(), Some("gt"));
    }

    #[test]
    fn parse_github_tree_url_with_path() {
        let r = parse_source_ref("https://github.com/example/topos/tree/main/bundles/gt");
        assert_eq!(r.source, "https://github.com/example/topos.git");
        assert_eq!(r.reference.as_deref(), Some("main"));
        assert_eq!(r.subpath.as_deref(), Some("bundles/gt"));
    }

    #[test]
    fn parse_github_tree_url_without_path() {
        let r = parse_source_ref("https://github.com/example/topos/tree/v1.2");
        assert_eq!(r.source, "https://github.com/example/topos.git");
        assert_eq!(r.reference.as_deref(), Some("v1.2"));
        assert_eq!(r.subpath, None);
    }

    #[test]
    fn explicit_hash_ref_wins_over_tree_ref() {
        let r = parse_source_ref("https://github.com/example/topos/tree/main/gt#pinned");
        assert_eq!(r.reference.as_deref(), Some("pinned"));
        assert_eq!(r.subpath.as_deref(), Some("gt"));
    }

    #[test]
    fn local_reference_untouched() {
        let r = parse_source_ref("//topologies/gt#notaref");
        assert_eq!(r.source, "//topologies/gt#notaref");
        assert_eq!(r.subpath, None);
        assert_eq!(r.reference, None);
    }

    #[test]
    fn include_cache_path_shape() {
        let p = include_cache_path(Path::new("/city"), "https://github.com/example/extras.git");
        let name = p.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("extras-"), "got {name}");
        assert_eq!(name.len(), "extras-".len() + 12);
        assert!(p.starts_with("/city/.gc/topologies/_inc"));
    }

    #[test]
    fn include_cache_path_scp_slug() {
        let p = include_cache_path(Path::new("/city"), "git@example.com:deep/nested/topo.git");
        let name = p.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("topo-"), "got {name}");
    }

    #[test]
    fn named_topology_dir_remote_vs_local() {
        let remote = TopologySource {
            source: "https://example.com/topo.git".to_string(),
            path: Some("gt".to_string()),
            ..Default::default()
        };
        assert_eq!(
            topology_source_dir(Path::new("/city"), "gastown", &remote),
            PathBuf::from("/city/.gc/topologies/gastown/gt")
        );

        let local = TopologySource {
            source: "vendor/topos".to_string(),
            ..Default::default()
        };
        assert_eq!(
            topology_source_dir(Path::new("/city"), "vendored", &local),
            PathBuf::from("/city/vendor/topos")
        );
    }
}
