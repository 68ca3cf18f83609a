//! Topology bundle loading.
//!
//! A topology is a directory with a `topology.toml` declaring agents,
//! providers, and further includes. Includes load first (they are the
//! base layer; the parent overrides), recursion shares a seen-set of
//! canonical directories for cycle detection, and every agent is
//! stamped with its scope directory, source directory, and root-relative
//! paths on the way in.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{Agent, ProviderSpec};
use crate::error::ConfigError;
use crate::fetch::{ensure_include_cached, is_remote};
use crate::merge::adjust_agent_paths;
use crate::paths::resolve_config_path;
use crate::provenance::Provenance;

/// Highest topology schema this build understands.
pub const CURRENT_SCHEMA: i64 = 1;

#[derive(Debug, Clone, Default, Deserialize)]
struct TopologyFile {
    #[serde(default)]
    topology: TopologyMeta,
    #[serde(default)]
    agents: Vec<Agent>,
    #[serde(default)]
    providers: BTreeMap<String, ProviderSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TopologyMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    schema: Option<i64>,
    /// Accepted for forward compatibility; not interpreted.
    #[serde(default)]
    #[allow(dead_code)]
    version: Option<String>,
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    city_agents: Vec<String>,
}

/// What one topology tree contributes: agents and providers with
/// includes layered underneath the parent, plus every visited topology
/// directory in depth-first order (parent last).
#[derive(Debug, Clone, Default)]
pub struct TopologyBundle {
    pub agents: Vec<Agent>,
    pub providers: BTreeMap<String, ProviderSpec>,
    pub dirs: Vec<PathBuf>,
}

/// Load the topology at `dir`, recursing through its includes.
///
/// `rig_name` is stamped onto agents without an explicit `dir` ("" for a
/// city-scoped expansion). `seen` carries the canonical path of every
/// directory on the current include chain; a repeat is a cycle.
pub fn load_topology(
    dir: &Path,
    city_root: &Path,
    rig_name: &str,
    seen: &mut Vec<PathBuf>,
    prov: &mut Provenance,
) -> Result<TopologyBundle, ConfigError> {
    let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    if seen.contains(&canonical) {
        return Err(ConfigError::TopologyCycle { dir: canonical });
    }
    seen.push(canonical);

    let toml_path = dir.join("topology.toml");
    let text = fs::read_to_string(&toml_path).map_err(|e| ConfigError::io(&toml_path, e))?;
    let file: TopologyFile =
        toml::from_str(&text).map_err(|e| ConfigError::parse(&toml_path, e))?;

    if file.topology.name.is_empty() {
        return Err(ConfigError::TopologyMissingName { path: toml_path });
    }
    match file.topology.schema {
        Some(s) if (1..=CURRENT_SCHEMA).contains(&s) => {}
        other => {
            return Err(ConfigError::UnsupportedSchema {
                path: toml_path,
                schema: other.unwrap_or(0),
                supported: CURRENT_SCHEMA,
            });
        }
    }
    debug!(name = %file.topology.name, dir = %dir.display(), "loading topology");

    let mut bundle = TopologyBundle::default();

    // Includes are the base layer; the parent's own declarations come
    // after and override.
    for reference in &file.topology.includes {
        let child_dir = if is_remote(reference) {
            ensure_include_cached(city_root, reference)?
        } else {
            resolve_config_path(reference, dir, city_root)
        };
        let child = load_topology(&child_dir, city_root, rig_name, seen, prov)?;
        bundle.agents.extend(child.agents);
        for (key, spec) in child.providers {
            if bundle.providers.contains_key(&key) {
                prov.warn(format!(
                    "{}: provider '{}' defined by multiple includes; keeping the first",
                    dir.display(),
                    key
                ));
            } else {
                bundle.providers.insert(key, spec);
            }
        }
        bundle.dirs.extend(child.dirs);
    }

    for mut agent in file.agents {
        if agent.dir.is_empty() {
            agent.dir = rig_name.to_string();
        }
        agent.source_dir = dir.to_path_buf();
        adjust_agent_paths(&mut agent, dir, city_root);
        bundle.agents.push(agent);
    }

    // Parent providers win over included ones.
    for (key, spec) in file.providers {
        bundle.providers.insert(key, spec);
    }

    bundle.dirs.push(dir.to_path_buf());

    if !file.topology.city_agents.is_empty() {
        for listed in &file.topology.city_agents {
            if !bundle.agents.iter().any(|a| &a.name == listed) {
                return Err(ConfigError::UnknownCityAgent {
                    dir: dir.to_path_buf(),
                    name: listed.clone(),
                });
            }
        }
        for agent in &mut bundle.agents {
            agent.scope = if file.topology.city_agents.contains(&agent.name) {
                "city".to_string()
            } else {
                "rig".to_string()
            };
        }
    }

    seen.pop();
    Ok(bundle)
}
