//! Topology expansion into the merged configuration.
//!
//! City-level topologies contribute city-scoped agents ahead of the
//! user's own declarations; each rig's topologies contribute rig-scoped
//! agents behind them. Both paths share reference resolution (nicknames
//! from `[topologies.*]` map to the fetch cache, everything else is a
//! path) and feed collision warnings through provenance.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{Agent, CityConfig, Rig, TopologySource, Workspace};
use crate::error::ConfigError;
use crate::fetch::topology_source_dir;
use crate::paths::resolve_config_path;
use crate::provenance::Provenance;
use crate::topology::load_topology;

/// The workspace's topology references in application order:
/// `topology`, then `city_topologies`, then `includes`, deduped.
pub fn effective_city_topologies(workspace: &Workspace) -> Vec<String> {
    let mut refs = Vec::new();
    if !workspace.topology.is_empty() {
        refs.push(workspace.topology.clone());
    }
    refs.extend(workspace.city_topologies.iter().cloned());
    refs.extend(workspace.includes.iter().cloned());
    dedup_preserving_order(refs)
}

/// A rig's topology references in application order:
/// `topology`, then `rig_topologies`, then `includes`, deduped.
pub fn effective_rig_topologies(rig: &Rig) -> Vec<String> {
    let mut refs = Vec::new();
    if !rig.topology.is_empty() {
        refs.push(rig.topology.clone());
    }
    refs.extend(rig.rig_topologies.iter().cloned());
    refs.extend(rig.includes.iter().cloned());
    dedup_preserving_order(refs)
}

fn dedup_preserving_order(refs: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for r in refs {
        if !seen.contains(&r) {
            seen.push(r);
        }
    }
    seen
}

/// Resolve one topology reference to a directory: a nickname from
/// `[topologies.*]` maps to its source directory (fetch cache for
/// remotes), anything else resolves as a path against the city root.
pub fn resolve_topology_ref(
    topologies: &BTreeMap<String, TopologySource>,
    city_root: &Path,
    reference: &str,
) -> PathBuf {
    match topologies.get(reference) {
        Some(spec) => topology_source_dir(city_root, reference, spec),
        None => resolve_config_path(reference, city_root, city_root),
    }
}

/// Rewrite every nickname topology reference on the workspace and the
/// rigs to the directory it resolves to, in place. Non-nickname
/// references are left untouched.
pub fn resolve_named_topologies(cfg: &mut CityConfig, city_root: &Path) {
    let topologies = cfg.topologies.clone();
    let rewrite = |reference: &mut String| {
        if let Some(spec) = topologies.get(reference.as_str()) {
            *reference = topology_source_dir(city_root, reference, spec)
                .to_string_lossy()
                .into_owned();
        }
    };

    if !cfg.workspace.topology.is_empty() {
        rewrite(&mut cfg.workspace.topology);
    }
    cfg.workspace.city_topologies.iter_mut().for_each(&rewrite);
    cfg.workspace.includes.iter_mut().for_each(&rewrite);
    for rig in &mut cfg.rigs {
        if !rig.topology.is_empty() {
            rewrite(&mut rig.topology);
        }
        rig.rig_topologies.iter_mut().for_each(&rewrite);
        rig.includes.iter_mut().for_each(&rewrite);
    }
}

/// Expand city-level topologies: city-scoped and unscoped agents are
/// prepended to the agent list, providers merge additively (first
/// definition wins), and topology directories accumulate for formula
/// layering, shared-prompt discovery, and watching.
pub fn expand_city_topologies(
    cfg: &mut CityConfig,
    city_root: &Path,
    prov: &mut Provenance,
) -> Result<(), ConfigError> {
    let refs = effective_city_topologies(&cfg.workspace);
    if refs.is_empty() {
        return Ok(());
    }
    debug!(count = refs.len(), "expanding city topologies");

    let mut incoming: Vec<Agent> = Vec::new();
    for reference in refs {
        let dir = resolve_topology_ref(&cfg.topologies, city_root, &reference);
        let mut seen = Vec::new();
        let bundle = load_topology(&dir, city_root, "", &mut seen, prov)?;
        let source = dir.join("topology.toml");

        for agent in bundle.agents {
            if agent.scope == "rig" {
                continue;
            }
            if let Some(existing) = incoming
                .iter()
                .find(|a| a.qualified_name() == agent.qualified_name())
            {
                return Err(ConfigError::TopologyAgentCollision {
                    scope: "city scope".to_string(),
                    name: agent.name,
                    first: existing.source_dir.clone(),
                    second: agent.source_dir.clone(),
                });
            }
            prov.record_agent(agent.qualified_name(), &source);
            incoming.push(agent);
        }

        for (name, spec) in bundle.providers {
            cfg.providers.entry(name).or_insert(spec);
        }
        for d in bundle.dirs {
            register_topology_dir(cfg, &d);
        }
    }

    // Topology agents go first; user-declared agents keep their order
    // behind them.
    incoming.append(&mut cfg.agents);
    cfg.agents = incoming;
    Ok(())
}

/// Expand each rig's topologies: rig-scoped and unscoped agents are
/// appended (stamped with the rig name), rig overrides are applied, and
/// per-rig formula directories are collected for the layerer.
pub fn expand_rig_topologies(
    cfg: &mut CityConfig,
    city_root: &Path,
    prov: &mut Provenance,
) -> Result<BTreeMap<String, Vec<PathBuf>>, ConfigError> {
    let rigs = cfg.rigs.clone();
    let mut rig_formula_dirs: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for rig in &rigs {
        let refs = effective_rig_topologies(rig);
        if refs.is_empty() {
            continue;
        }
        debug!(rig = %rig.name, count = refs.len(), "expanding rig topologies");

        let mut assembled: Vec<Agent> = Vec::new();
        let mut formula_dirs: Vec<PathBuf> = Vec::new();

        for reference in &refs {
            let dir = resolve_topology_ref(&cfg.topologies, city_root, reference);
            let mut seen = Vec::new();
            let bundle = load_topology(&dir, city_root, &rig.name, &mut seen, prov)?;

            for agent in bundle.agents {
                if agent.scope == "city" {
                    continue;
                }
                if let Some(existing) = assembled
                    .iter()
                    .find(|a| a.qualified_name() == agent.qualified_name())
                {
                    return Err(ConfigError::TopologyAgentCollision {
                        scope: format!("rig '{}'", rig.name),
                        name: agent.name,
                        first: existing.source_dir.clone(),
                        second: agent.source_dir.clone(),
                    });
                }
                assembled.push(agent);
            }

            for d in bundle.dirs {
                let formulas = d.join("formulas");
                if formulas.is_dir() && !formula_dirs.contains(&formulas) {
                    formula_dirs.push(formulas);
                }
                register_shared_dir(cfg, &d);
            }
        }

        for ov in &rig.overrides {
            match assembled.iter_mut().find(|a| a.name == ov.agent) {
                Some(target) => ov.edit.apply_to(target),
                None => {
                    return Err(ConfigError::OverrideUnknown {
                        rig: rig.name.clone(),
                        agent: ov.agent.clone(),
                    });
                }
            }
        }

        for agent in &assembled {
            let source = agent.source_dir.join("topology.toml");
            prov.record_agent(agent.qualified_name(), &source);
        }
        cfg.agents.extend(assembled);

        if !formula_dirs.is_empty() {
            rig_formula_dirs.insert(rig.name.clone(), formula_dirs);
        }
    }
    Ok(rig_formula_dirs)
}

fn register_topology_dir(cfg: &mut CityConfig, dir: &Path) {
    if !cfg.topology_dirs.iter().any(|d| d == dir) {
        cfg.topology_dirs.push(dir.to_path_buf());
    }
    register_shared_dir(cfg, dir);
}

fn register_shared_dir(cfg: &mut CityConfig, dir: &Path) {
    let shared = dir.join("prompts").join("shared");
    if shared.is_dir() && !cfg.topology_shared_dirs.contains(&shared) {
        cfg.topology_shared_dirs.push(shared);
    }
}
