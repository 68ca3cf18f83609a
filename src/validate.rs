//! Post-composition validation.
//!
//! Runs once the agent list is final: identity uniqueness with every
//! contributing source directory named, pool ranges, the work/sling
//! query pairing rule for pooled agents, required rig fields, and bead
//! prefix uniqueness against the HQ prefix derived from the city name.

use std::collections::BTreeMap;

use crate::config::{Agent, CityConfig, Rig};
use crate::error::ConfigError;

/// Validate the composed configuration.
pub fn validate(cfg: &CityConfig) -> Result<(), ConfigError> {
    validate_agents(&cfg.agents)?;
    validate_rigs(&cfg.rigs, &cfg.workspace.name)
}

fn validate_agents(agents: &[Agent]) -> Result<(), ConfigError> {
    let mut by_name: BTreeMap<String, Vec<&Agent>> = BTreeMap::new();
    for agent in agents {
        if agent.name.is_empty() {
            let entity = if agent.dir.is_empty() {
                "agent".to_string()
            } else {
                format!("agent in '{}'", agent.dir)
            };
            return Err(ConfigError::MissingRequired {
                entity,
                field: "name",
            });
        }
        by_name.entry(agent.qualified_name()).or_default().push(agent);
    }

    for (qualified, group) in &by_name {
        if group.len() > 1 {
            let sources = group
                .iter()
                .map(|a| {
                    if a.source_dir.as_os_str().is_empty() {
                        "  (unknown source)".to_string()
                    } else {
                        format!("  {}", a.source_dir.display())
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            return Err(ConfigError::DuplicateAgent {
                name: qualified.clone(),
                sources,
            });
        }
    }

    for agent in agents {
        if let Some(pool) = &agent.pool {
            if pool.min > pool.max {
                return Err(ConfigError::PoolRange {
                    agent: agent.qualified_name(),
                    min: pool.min,
                    max: pool.max,
                });
            }
            if agent.work_query.is_some() != agent.sling_query.is_some() {
                return Err(ConfigError::WorkQueryUnpaired {
                    agent: agent.qualified_name(),
                });
            }
        }
    }
    Ok(())
}

fn validate_rigs(rigs: &[Rig], city_name: &str) -> Result<(), ConfigError> {
    let hq_prefix = if city_name.is_empty() {
        None
    } else {
        Some(derive_bead_prefix(city_name))
    };

    let mut seen_names: Vec<&str> = Vec::new();
    let mut seen_prefixes: BTreeMap<String, String> = BTreeMap::new();

    for rig in rigs {
        if rig.name.is_empty() {
            return Err(ConfigError::MissingRequired {
                entity: "rig".to_string(),
                field: "name",
            });
        }
        if rig.path.is_empty() {
            return Err(ConfigError::MissingRequired {
                entity: format!("rig '{}'", rig.name),
                field: "path",
            });
        }
        if seen_names.contains(&rig.name.as_str()) {
            return Err(ConfigError::DuplicateRig {
                name: rig.name.clone(),
            });
        }
        seen_names.push(rig.name.as_str());

        let prefix = effective_rig_prefix(rig);
        if let Some(hq) = &hq_prefix {
            if &prefix == hq {
                return Err(ConfigError::HqPrefixCollision {
                    rig: rig.name.clone(),
                    prefix,
                    city: city_name.to_string(),
                });
            }
        }
        if let Some(other) = seen_prefixes.get(&prefix) {
            return Err(ConfigError::DuplicateRigPrefix {
                rig: rig.name.clone(),
                prefix,
                other: other.clone(),
            });
        }
        seen_prefixes.insert(prefix, rig.name.clone());
    }
    Ok(())
}

/// The bead prefix a rig actually uses: the explicit `prefix` field when
/// set (derivation suppressed), else derived from the name.
pub fn effective_rig_prefix(rig: &Rig) -> String {
    match &rig.prefix {
        Some(p) => p.clone(),
        None => derive_bead_prefix(&rig.name),
    }
}

/// Derive a short bead prefix from an entity name.
///
/// Language suffix tokens (`-go`, `-py`) are stripped, the name splits
/// on `-`, `_`, and camel-case transitions, and multi-part names keep
/// one initial per part while single-part names keep their first two
/// letters. The result is lower-cased.
pub fn derive_bead_prefix(name: &str) -> String {
    let stripped = strip_language_suffix(name);
    let parts = split_name_parts(stripped);
    let prefix: String = match parts.len() {
        0 => String::new(),
        1 => parts[0].chars().take(2).collect(),
        _ => parts.iter().filter_map(|p| p.chars().next()).collect(),
    };
    prefix.to_lowercase()
}

fn strip_language_suffix(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    for suffix in ["-go", "-py"] {
        if lower.len() > suffix.len() && lower.ends_with(suffix) {
            return &name[..name.len() - suffix.len()];
        }
    }
    name
}

/// Split on `-`, `_`, and lowercase-to-uppercase boundaries.
fn split_name_parts(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '-' || c == '_' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase();
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
