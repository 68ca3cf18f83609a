//! Late-stage patch application.
//!
//! Patches accumulate from the root and every fragment, then apply once
//! after merge and topology expansion, targeting entities by identity
//! key. Patches are intentional edits: unlike fragment merges they emit
//! no collision warnings. The staging area is consumed by application.

use std::mem;

use crate::config::{CityConfig, Patches, ProviderPatch, ProviderSpec};
use crate::error::ConfigError;

/// Apply and clear the staged patches. A patch that targets a
/// non-existent agent, rig, or provider aborts composition.
pub fn apply_patches(cfg: &mut CityConfig) -> Result<(), ConfigError> {
    let staged = mem::take(&mut cfg.patches);
    apply(cfg, staged)
}

fn apply(cfg: &mut CityConfig, staged: Patches) -> Result<(), ConfigError> {
    for patch in staged.agents {
        let target = cfg
            .agents
            .iter_mut()
            .find(|a| a.dir == patch.dir && a.name == patch.name)
            .ok_or_else(|| ConfigError::PatchTargetMissing {
                kind: "agent",
                target: patch.qualified_name(),
            })?;
        patch.edit.apply_to(target);
    }

    for patch in staged.rigs {
        let target = cfg
            .rigs
            .iter_mut()
            .find(|r| r.name == patch.name)
            .ok_or_else(|| ConfigError::PatchTargetMissing {
                kind: "rig",
                target: patch.name.clone(),
            })?;
        if let Some(v) = &patch.path {
            target.path = v.clone();
        }
        if let Some(v) = &patch.prefix {
            target.prefix = Some(v.clone());
        }
        if let Some(v) = patch.suspended {
            target.suspended = v;
        }
        if let Some(v) = &patch.topology {
            target.topology = v.clone();
        }
        if let Some(v) = &patch.rig_topologies {
            target.rig_topologies = v.clone();
        }
        if let Some(v) = &patch.includes {
            target.includes = v.clone();
        }
        if let Some(v) = &patch.formula_dir {
            target.formula_dir = Some(v.clone());
        }
    }

    for patch in staged.providers {
        if !cfg.providers.contains_key(&patch.name) {
            return Err(ConfigError::PatchTargetMissing {
                kind: "provider",
                target: patch.name.clone(),
            });
        }
        let name = patch.name.clone();
        if patch.replace {
            cfg.providers.insert(name, spec_from_patch(&patch));
        } else {
            let target = cfg.providers.get_mut(&name).expect("checked above");
            merge_provider_patch(target, &patch);
        }
    }

    Ok(())
}

/// Replace mode: a fresh spec from only the patch's set fields. Fields
/// absent from the patch come out empty, env and slices included.
fn spec_from_patch(patch: &ProviderPatch) -> ProviderSpec {
    let mut env = patch.env.clone();
    for key in &patch.env_remove {
        env.remove(key);
    }
    ProviderSpec {
        display_name: patch.display_name.clone(),
        command: patch.command.clone(),
        args: patch.args.clone(),
        env,
        prompt_mode: patch.prompt_mode,
        prompt_flag: patch.prompt_flag.clone(),
        ready_delay_ms: patch.ready_delay_ms,
        ready_prompt_prefix: patch.ready_prompt_prefix.clone(),
        process_names: patch.process_names.clone(),
        emits_permission_warning: patch.emits_permission_warning,
    }
}

fn merge_provider_patch(target: &mut ProviderSpec, patch: &ProviderPatch) {
    if let Some(v) = &patch.display_name {
        target.display_name = Some(v.clone());
    }
    if let Some(v) = &patch.command {
        target.command = Some(v.clone());
    }
    if let Some(v) = &patch.args {
        target.args = Some(v.clone());
    }
    if let Some(v) = patch.prompt_mode {
        target.prompt_mode = Some(v);
    }
    if let Some(v) = &patch.prompt_flag {
        target.prompt_flag = Some(v.clone());
    }
    if let Some(v) = patch.ready_delay_ms {
        target.ready_delay_ms = Some(v);
    }
    if let Some(v) = &patch.ready_prompt_prefix {
        target.ready_prompt_prefix = Some(v.clone());
    }
    if let Some(v) = &patch.process_names {
        target.process_names = Some(v.clone());
    }
    if let Some(v) = patch.emits_permission_warning {
        target.emits_permission_warning = Some(v);
    }
    for (key, value) in &patch.env {
        target.env.insert(key.clone(), value.clone());
    }
    for key in &patch.env_remove {
        target.env.remove(key);
    }
}
