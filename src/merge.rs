//! Fragment merging.
//!
//! Each section of a fragment has its own merge rule: agent and rig
//! arrays concatenate, providers deep-merge per field, workspace fields
//! are last-writer-wins, opaque sub-tables are last-writer-wins at table
//! level, and patches accumulate for late application. Collisions warn
//! through the provenance tracker; only a nested `include` aborts.

use std::path::Path;

use crate::config::{Agent, CityConfig, ProviderSpec};
use crate::error::ConfigError;
use crate::parser::DefinedKeys;
use crate::paths::adjust_fragment_path;
use crate::provenance::Provenance;

/// Merge a parsed fragment into `base` in place.
///
/// `defined` is the fragment's defined-key set; `fragment_path` is used
/// for provenance and warning text; `root_dir` anchors path rewriting.
pub fn merge_fragment(
    base: &mut CityConfig,
    fragment: CityConfig,
    defined: &DefinedKeys,
    fragment_path: &Path,
    root_dir: &Path,
    prov: &mut Provenance,
) -> Result<(), ConfigError> {
    if !fragment.include.is_empty() {
        return Err(ConfigError::NestedInclude {
            path: fragment_path.to_path_buf(),
        });
    }
    let fragment_dir = fragment_path.parent().unwrap_or(root_dir).to_path_buf();

    // Agents: concatenate, warn on duplicate qualified name.
    for mut agent in fragment.agents {
        adjust_agent_paths(&mut agent, &fragment_dir, root_dir);
        agent.source_dir = fragment_dir.clone();
        let qualified = agent.qualified_name();
        if let Some(existing) = prov.agent_source(&qualified) {
            prov.warn(format!(
                "{}: duplicate agent '{}' (also declared in {})",
                fragment_path.display(),
                qualified,
                existing.display()
            ));
        }
        prov.record_agent(&qualified, fragment_path);
        base.agents.push(agent);
    }

    // Rigs: concatenate, warn on duplicate name.
    for rig in fragment.rigs {
        if let Some(existing) = prov.rig_source(&rig.name) {
            prov.warn(format!(
                "{}: duplicate rig '{}' (also declared in {})",
                fragment_path.display(),
                rig.name,
                existing.display()
            ));
        }
        prov.record_rig(&rig.name, fragment_path);
        base.rigs.push(rig);
    }

    // Providers: add new names, field-merge existing ones.
    for (name, spec) in fragment.providers {
        match base.providers.get_mut(&name) {
            None => {
                base.providers.insert(name, spec);
            }
            Some(existing) => {
                merge_provider_spec(existing, &spec, &name, fragment_path, prov);
            }
        }
    }

    merge_workspace(base, &fragment.workspace, defined, fragment_path, prov);

    // Topologies: add new names; warn and overwrite on collision.
    for (name, source) in fragment.topologies {
        if base.topologies.contains_key(&name) {
            prov.warn(format!(
                "{}: topology '{}' redefined; replacing the earlier definition",
                fragment_path.display(),
                name
            ));
        }
        base.topologies.insert(name, source);
    }

    // Patches accumulate for the late-stage applier.
    base.patches.agents.extend(fragment.patches.agents);
    base.patches.rigs.extend(fragment.patches.rigs);
    base.patches.providers.extend(fragment.patches.providers);

    // Opaque sub-configs: last-writer-wins at table level.
    if fragment.beads.is_some() {
        base.beads = fragment.beads;
    }
    if fragment.dolt.is_some() {
        base.dolt = fragment.dolt;
    }
    if fragment.daemon.is_some() {
        base.daemon = fragment.daemon;
    }
    if fragment.session.is_some() {
        base.session = fragment.session;
    }
    if fragment.mail.is_some() {
        base.mail = fragment.mail;
    }
    if fragment.events.is_some() {
        base.events = fragment.events;
    }

    if defined.contains("formulas") {
        base.formulas = fragment.formulas;
    }

    Ok(())
}

/// Rewrite an agent's file references to be root-relative and uniform,
/// regardless of which fragment or topology declared them.
pub(crate) fn adjust_agent_paths(agent: &mut Agent, decl_dir: &Path, root_dir: &Path) {
    agent.prompt_template = adjust_fragment_path(&agent.prompt_template, decl_dir, root_dir);
    agent.session_setup_script =
        adjust_fragment_path(&agent.session_setup_script, decl_dir, root_dir);
    agent.overlay_dir = adjust_fragment_path(&agent.overlay_dir, decl_dir, root_dir);
}

fn merge_workspace(
    base: &mut CityConfig,
    fragment: &crate::config::Workspace,
    defined: &DefinedKeys,
    fragment_path: &Path,
    prov: &mut Provenance,
) {
    let ws = &mut base.workspace;

    let mut overridden = |field: &str, was_set: bool, prov: &mut Provenance| {
        if was_set {
            let prev = prov
                .workspace_field_source(field)
                .unwrap_or(&prov.root)
                .to_path_buf();
            prov.warn(format!(
                "{}: workspace.{} overrides value set in {}",
                fragment_path.display(),
                field,
                prev.display()
            ));
        }
        prov.record_workspace_field(field, fragment_path);
    };

    if defined.contains("workspace.name") {
        overridden("name", !ws.name.is_empty(), prov);
        ws.name = fragment.name.clone();
    }
    if defined.contains("workspace.provider") {
        overridden("provider", ws.provider.is_some(), prov);
        ws.provider = fragment.provider.clone();
    }
    if defined.contains("workspace.start_command") {
        overridden("start_command", ws.start_command.is_some(), prov);
        ws.start_command = fragment.start_command.clone();
    }
    if defined.contains("workspace.session_name") {
        overridden("session_name", ws.session_name.is_some(), prov);
        ws.session_name = fragment.session_name.clone();
    }
    if defined.contains("workspace.topology") {
        overridden("topology", !ws.topology.is_empty(), prov);
        ws.topology = fragment.topology.clone();
    }
    if defined.contains("workspace.city_topologies") {
        overridden("city_topologies", !ws.city_topologies.is_empty(), prov);
        ws.city_topologies = fragment.city_topologies.clone();
    }
    if defined.contains("workspace.includes") {
        overridden("includes", !ws.includes.is_empty(), prov);
        ws.includes = fragment.includes.clone();
    }
    // Replace-when-defined: a defined list wins wholesale, even if empty.
    if defined.contains("workspace.install_agent_hooks") {
        let was_set = ws
            .install_agent_hooks
            .as_ref()
            .is_some_and(|v| !v.is_empty());
        overridden("install_agent_hooks", was_set, prov);
        ws.install_agent_hooks = fragment.install_agent_hooks.clone();
    }
}

/// Field-level deep merge of one provider spec into another: defined
/// scalars override with a warning when the base had a value, defined
/// slices replace, env merges additively per key.
pub(crate) fn merge_provider_spec(
    base: &mut ProviderSpec,
    fragment: &ProviderSpec,
    name: &str,
    fragment_path: &Path,
    prov: &mut Provenance,
) {
    let mut warn_field = |field: &str, prov: &mut Provenance| {
        prov.warn(format!(
            "{}: providers.{}.{} overrides an earlier value",
            fragment_path.display(),
            name,
            field
        ));
    };

    if let Some(v) = &fragment.display_name {
        if base.display_name.is_some() {
            warn_field("display_name", prov);
        }
        base.display_name = Some(v.clone());
    }
    if let Some(v) = &fragment.command {
        if base.command.is_some() {
            warn_field("command", prov);
        }
        base.command = Some(v.clone());
    }
    if let Some(v) = fragment.prompt_mode {
        if base.prompt_mode.is_some() {
            warn_field("prompt_mode", prov);
        }
        base.prompt_mode = Some(v);
    }
    if let Some(v) = &fragment.prompt_flag {
        if base.prompt_flag.is_some() {
            warn_field("prompt_flag", prov);
        }
        base.prompt_flag = Some(v.clone());
    }
    if let Some(v) = fragment.ready_delay_ms {
        if base.ready_delay_ms.is_some() {
            warn_field("ready_delay_ms", prov);
        }
        base.ready_delay_ms = Some(v);
    }
    if let Some(v) = &fragment.ready_prompt_prefix {
        if base.ready_prompt_prefix.is_some() {
            warn_field("ready_prompt_prefix", prov);
        }
        base.ready_prompt_prefix = Some(v.clone());
    }
    if let Some(v) = fragment.emits_permission_warning {
        if base.emits_permission_warning.is_some() {
            warn_field("emits_permission_warning", prov);
        }
        base.emits_permission_warning = Some(v);
    }
    if let Some(v) = &fragment.args {
        if base.args.as_ref().is_some_and(|a| !a.is_empty()) {
            warn_field("args", prov);
        }
        base.args = Some(v.clone());
    }
    if let Some(v) = &fragment.process_names {
        if base.process_names.as_ref().is_some_and(|p| !p.is_empty()) {
            warn_field("process_names", prov);
        }
        base.process_names = Some(v.clone());
    }
    for (key, value) in &fragment.env {
        if base.env.contains_key(key) {
            prov.warn(format!(
                "{}: providers.{}.env.{} overrides an earlier value",
                fragment_path.display(),
                name,
                key
            ));
        }
        base.env.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_config;
    use std::path::PathBuf;

    fn merge_texts(base_text: &str, frag_text: &str) -> (CityConfig, Provenance) {
        let root_path = PathBuf::from("/city/city.toml");
        let frag_path = PathBuf::from("/city/agents/extra.toml");
        let (mut base, _) = parse_config(base_text, &root_path).unwrap();
        let (frag, defined) = parse_config(frag_text, &frag_path).unwrap();
        let mut prov = Provenance::new(&root_path);
        merge_fragment(
            &mut base,
            frag,
            &defined,
            &frag_path,
            Path::new("/city"),
            &mut prov,
        )
        .unwrap();
        (base, prov)
    }

    #[test]
    fn agents_concatenate_in_order() {
        let (cfg, _) = merge_texts(
            r#"
[[agents]]
name = "mayor"
"#,
            r#"
[[agents]]
name = "worker"
dir = "project"
"#,
        );
        assert_eq!(cfg.agents.len(), 2);
        assert_eq!(cfg.agents[0].name, "mayor");
        assert_eq!(cfg.agents[1].qualified_name(), "project/worker");
    }

    #[test]
    fn fragment_agent_paths_rewritten_root_relative() {
        let (cfg, _) = merge_texts(
            "",
            r#"
[[agents]]
name = "worker"
prompt_template = "prompts/worker.md"
session_setup_script = "//scripts/setup.sh"
"#,
        );
        assert_eq!(cfg.agents[0].prompt_template, "agents/prompts/worker.md");
        assert_eq!(cfg.agents[0].session_setup_script, "scripts/setup.sh");
        assert_eq!(cfg.agents[0].source_dir, PathBuf::from("/city/agents"));
    }

    #[test]
    fn provider_deep_merge_with_env() {
        let (cfg, prov) = merge_texts(
            r#"
[providers.custom]
command = "my-agent"
prompt_mode = "arg"
ready_delay_ms = 5000

[providers.custom.env]
KEY_A = "1"
KEY_B = "2"
"#,
            r#"
[providers.custom]
ready_delay_ms = 10000

[providers.custom.env]
KEY_B = "override"
KEY_C = "3"
"#,
        );
        let spec = cfg.providers.get("custom").unwrap();
        assert_eq!(spec.command.as_deref(), Some("my-agent"));
        assert_eq!(spec.prompt_mode, Some(crate::config::PromptMode::Arg));
        assert_eq!(spec.ready_delay_ms, Some(10000));
        assert_eq!(spec.env.get("KEY_A").map(String::as_str), Some("1"));
        assert_eq!(spec.env.get("KEY_B").map(String::as_str), Some("override"));
        assert_eq!(spec.env.get("KEY_C").map(String::as_str), Some("3"));

        assert!(prov.warnings.iter().any(|w| w.contains("ready_delay_ms")));
        assert!(prov.warnings.iter().any(|w| w.contains("env.KEY_B")));
        assert!(!prov.warnings.iter().any(|w| w.contains("env.KEY_C")));
    }

    #[test]
    fn new_provider_added_without_warning() {
        let (cfg, prov) = merge_texts(
            r#"
[providers.custom]
command = "my-agent"
"#,
            r#"
[providers.other]
command = "other-agent"
"#,
        );
        assert_eq!(cfg.providers.len(), 2);
        assert!(prov.warnings.is_empty());
    }

    #[test]
    fn workspace_last_writer_wins_with_warning() {
        let (cfg, prov) = merge_texts(
            r#"
[workspace]
name = "old-town"
"#,
            r#"
[workspace]
name = "new-town"
"#,
        );
        assert_eq!(cfg.workspace.name, "new-town");
        assert!(prov.warnings.iter().any(|w| w.contains("workspace.name")));
    }

    #[test]
    fn workspace_empty_base_field_overridden_silently() {
        let (cfg, prov) = merge_texts(
            "",
            r#"
[workspace]
name = "new-town"
"#,
        );
        assert_eq!(cfg.workspace.name, "new-town");
        assert!(prov.warnings.is_empty());
    }

    #[test]
    fn install_agent_hooks_replaced_when_defined() {
        let (cfg, prov) = merge_texts(
            r#"
[workspace]
install_agent_hooks = ["codex", "gemini"]
"#,
            r#"
[workspace]
install_agent_hooks = []
"#,
        );
        assert_eq!(cfg.workspace.install_agent_hooks, Some(vec![]));
        assert!(
            prov.warnings
                .iter()
                .any(|w| w.contains("install_agent_hooks"))
        );
    }

    #[test]
    fn nested_include_rejected() {
        let root_path = PathBuf::from("/city/city.toml");
        let frag_path = PathBuf::from("/city/frag.toml");
        let (mut base, _) = parse_config("", &root_path).unwrap();
        let (frag, defined) =
            parse_config(r#"include = ["more.toml"]"#, &frag_path).unwrap();
        let mut prov = Provenance::new(&root_path);
        let err = merge_fragment(
            &mut base,
            frag,
            &defined,
            &frag_path,
            Path::new("/city"),
            &mut prov,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NestedInclude { .. }));
    }

    #[test]
    fn topology_collision_warns_and_overwrites() {
        let (cfg, prov) = merge_texts(
            r#"
[topologies.gastown]
source = "https://example.com/old.git"
"#,
            r#"
[topologies.gastown]
source = "https://example.com/new.git"
"#,
        );
        assert_eq!(
            cfg.topologies.get("gastown").unwrap().source,
            "https://example.com/new.git"
        );
        assert!(prov.warnings.iter().any(|w| w.contains("gastown")));
    }

    #[test]
    fn opaque_tables_last_writer_wins() {
        let (cfg, _) = merge_texts(
            r#"
[beads]
backend = "sqlite"
shared = true
"#,
            r#"
[beads]
backend = "dolt"
"#,
        );
        let beads = cfg.beads.unwrap();
        assert_eq!(beads.get("backend").unwrap().as_str(), Some("dolt"));
        // Table-level replacement, not a deep merge.
        assert!(!beads.contains_key("shared"));
    }

    #[test]
    fn patches_accumulate() {
        let (cfg, _) = merge_texts(
            r#"
[[patches.agents]]
name = "mayor"
suspended = true
"#,
            r#"
[[patches.agents]]
dir = "hw"
name = "witness"
suspended = false
"#,
        );
        assert_eq!(cfg.patches.agents.len(), 2);
        assert_eq!(cfg.patches.agents[1].qualified_name(), "hw/witness");
    }
}
