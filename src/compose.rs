//! The composition driver.
//!
//! Fixed pipeline order: parse root, seed provenance, expand includes,
//! (optionally) fetch remote topologies, expand city topologies, apply
//! patches, resolve named topology references, expand rig topologies,
//! validate, compute formula layers. Any failure aborts the whole load;
//! a partial configuration is never returned.

use std::mem;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::CityConfig;
use crate::error::ConfigError;
use crate::expand::{expand_city_topologies, expand_rig_topologies, resolve_named_topologies};
use crate::fetch::fetch_topologies;
use crate::formula::compute_formula_layers;
use crate::merge::{adjust_agent_paths, merge_fragment};
use crate::parser::{DefinedKeys, load_config};
use crate::patch::apply_patches;
use crate::paths::resolve_config_path;
use crate::provenance::Provenance;
use crate::validate::validate;

/// Knobs for one composition run.
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Extra include references appended after the root's own list
    /// (e.g. from a command line).
    pub extra_includes: Vec<String>,

    /// Fetch remote named topologies (and rewrite the lockfile) before
    /// expansion. Off by default: composition then resolves against
    /// whatever the cache already holds.
    pub fetch: bool,
}

/// Compose the configuration rooted at `root_path`.
///
/// Returns the fully-resolved tree and its provenance. The caller owns
/// the result; re-composing starts over from the files.
pub fn compose(
    root_path: &Path,
    options: &ComposeOptions,
) -> Result<(CityConfig, Provenance), ConfigError> {
    let city_root = root_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let (mut cfg, defined) = load_config(root_path)?;
    let mut prov = Provenance::new(root_path);
    track_root(&mut cfg, &defined, root_path, &city_root, &mut prov);

    let mut includes = mem::take(&mut cfg.include);
    includes.extend(options.extra_includes.iter().cloned());
    debug!(root = %root_path.display(), includes = includes.len(), "composing");

    for reference in &includes {
        let frag_path = resolve_config_path(reference, &city_root, &city_root);
        if !frag_path.is_file() {
            return Err(ConfigError::FragmentNotFound {
                reference: reference.clone(),
                path: frag_path,
            });
        }
        let (fragment, frag_defined) = load_config(&frag_path)?;
        merge_fragment(
            &mut cfg,
            fragment,
            &frag_defined,
            &frag_path,
            &city_root,
            &mut prov,
        )?;
        prov.add_source(&frag_path);
    }

    if options.fetch {
        fetch_topologies(&cfg, &city_root)?;
    }

    expand_city_topologies(&mut cfg, &city_root, &mut prov)?;
    apply_patches(&mut cfg)?;
    resolve_named_topologies(&mut cfg, &city_root);
    let rig_formula_dirs = expand_rig_topologies(&mut cfg, &city_root, &mut prov)?;
    validate(&cfg)?;
    cfg.formula_layers = compute_formula_layers(
        &cfg.topology_dirs,
        cfg.formulas.dir.as_deref(),
        &rig_formula_dirs,
        &cfg.rigs,
        &city_root,
    );

    Ok((cfg, prov))
}

/// Seed provenance from the root document and normalize root-declared
/// agent paths (a `//` marker means the same thing everywhere).
fn track_root(
    cfg: &mut CityConfig,
    defined: &DefinedKeys,
    root_path: &Path,
    city_root: &PathBuf,
    prov: &mut Provenance,
) {
    for agent in &mut cfg.agents {
        adjust_agent_paths(agent, city_root, city_root);
        agent.source_dir = city_root.clone();
        prov.record_agent(agent.qualified_name(), root_path);
    }
    for rig in &cfg.rigs {
        prov.record_rig(&rig.name, root_path);
    }
    for field in [
        "name",
        "provider",
        "start_command",
        "session_name",
        "install_agent_hooks",
        "topology",
        "city_topologies",
        "includes",
    ] {
        if defined.contains(&format!("workspace.{field}")) {
            prov.record_workspace_field(field, root_path);
        }
    }
}
