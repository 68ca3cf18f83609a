//! Path reference resolution.
//!
//! Config fragments and topologies may reference files three ways:
//! `//`-prefixed (relative to the city root), absolute, or relative to
//! the declaring file's directory. Every loader funnels references
//! through these two functions so the composed tree only ever contains
//! root-relative or absolute paths.

use std::path::{Component, Path, PathBuf};

/// Resolve a path reference to an absolute path.
///
/// `//`-prefixed paths are joined to `root_dir`, absolute paths pass
/// through unchanged, and everything else is joined to `decl_dir`.
pub fn resolve_config_path(reference: &str, decl_dir: &Path, root_dir: &Path) -> PathBuf {
    if let Some(rest) = reference.strip_prefix("//") {
        return root_dir.join(rest);
    }
    let path = Path::new(reference);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    decl_dir.join(path)
}

/// Rewrite a fragment-local path reference to be root-relative.
///
/// Empty input returns empty, `//`-prefixed input has the marker
/// stripped, absolute input passes through. A fragment-relative path is
/// re-expressed relative to `root_dir`; if the fragment lives outside
/// the root the absolute form is kept.
pub fn adjust_fragment_path(reference: &str, frag_dir: &Path, root_dir: &Path) -> String {
    if reference.is_empty() {
        return String::new();
    }
    if let Some(rest) = reference.strip_prefix("//") {
        return rest.to_string();
    }
    if Path::new(reference).is_absolute() {
        return reference.to_string();
    }
    let joined = normalize(&frag_dir.join(reference));
    let root = normalize(root_dir);
    match joined.strip_prefix(&root) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => joined.to_string_lossy().into_owned(),
    }
}

/// Lexically fold `.` and `..` components without touching the
/// filesystem, so `agents/../prompts/x.md` and `prompts/x.md` compare
/// equal under `strip_prefix`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
