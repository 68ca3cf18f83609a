//! Provider resolution.
//!
//! A provider names the external agent CLI a session runs. Resolution
//! collapses four layers into one [`ResolvedProvider`]: the built-in
//! registry, city-level `[providers.*]` overrides, the workspace
//! default, and per-agent field overrides. Start commands short-circuit
//! the whole mechanism.
//!
//! PATH lookups are injected as a closure so callers (and tests) decide
//! what "installed" means.

use std::collections::BTreeMap;

use crate::config::{Agent, PromptMode, ProviderSpec, Workspace};
use crate::error::ConfigError;

/// A fully-collapsed provider ready for session launch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedProvider {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub prompt_mode: PromptMode,
    pub prompt_flag: Option<String>,
    pub ready_delay_ms: u64,
    pub ready_prompt_prefix: Option<String>,
    pub process_names: Vec<String>,
    pub emits_permission_warning: bool,
}

/// The built-in provider registry in auto-detection priority order.
///
/// Returns a fresh copy on every call so callers cannot corrupt the
/// registry. The order is part of the contract.
pub fn builtin_providers() -> Vec<(String, ProviderSpec)> {
    fn spec(
        display_name: &str,
        command: &str,
        prompt_mode: PromptMode,
        ready_delay_ms: u64,
        emits_permission_warning: bool,
    ) -> ProviderSpec {
        ProviderSpec {
            display_name: Some(display_name.to_string()),
            command: Some(command.to_string()),
            prompt_mode: Some(prompt_mode),
            ready_delay_ms: Some(ready_delay_ms),
            process_names: Some(vec![command.to_string()]),
            emits_permission_warning: Some(emits_permission_warning),
            ..Default::default()
        }
    }

    vec![
        (
            "claude".to_string(),
            spec("Claude Code", "claude", PromptMode::Arg, 1500, true),
        ),
        (
            "codex".to_string(),
            spec("Codex CLI", "codex", PromptMode::Arg, 1500, false),
        ),
        ("gemini".to_string(), {
            let mut s = spec("Gemini CLI", "gemini", PromptMode::Flag, 1500, false);
            s.prompt_flag = Some("-i".to_string());
            s
        }),
        (
            "cursor".to_string(),
            spec("Cursor Agent", "cursor-agent", PromptMode::Arg, 2000, false),
        ),
        (
            "copilot".to_string(),
            spec("Copilot CLI", "copilot", PromptMode::Arg, 1500, false),
        ),
        (
            "amp".to_string(),
            spec("Amp", "amp", PromptMode::Arg, 1000, false),
        ),
        (
            "opencode".to_string(),
            spec("opencode", "opencode", PromptMode::Arg, 1000, false),
        ),
        (
            "auggie".to_string(),
            spec("Auggie", "auggie", PromptMode::Arg, 1500, false),
        ),
        (
            "pi".to_string(),
            spec("pi", "pi", PromptMode::Arg, 1000, false),
        ),
    ]
}

/// Resolve the provider an agent runs under.
///
/// Order: the agent's start command wins outright; then the agent's
/// provider name, the workspace's, the workspace start command, and
/// finally auto-detection down the built-in registry via `look_path`.
pub fn resolve_provider<F>(
    agent: &Agent,
    workspace: &Workspace,
    city_providers: &BTreeMap<String, ProviderSpec>,
    look_path: F,
) -> Result<ResolvedProvider, ConfigError>
where
    F: Fn(&str) -> bool,
{
    if let Some(cmd) = &agent.start_command {
        return Ok(start_command_provider(cmd));
    }

    let name = if !agent.provider.is_empty() {
        agent.provider.clone()
    } else if let Some(p) = workspace.provider.as_ref().filter(|p| !p.is_empty()) {
        p.clone()
    } else if let Some(cmd) = &workspace.start_command {
        return Ok(start_command_provider(cmd));
    } else {
        autodetect(&look_path).ok_or(ConfigError::NoProvider)?
    };

    let builtin = builtin_providers()
        .into_iter()
        .find(|(n, _)| n == &name)
        .map(|(_, s)| s);
    let city = city_providers.get(&name);
    if builtin.is_none() && city.is_none() {
        return Err(ConfigError::UnknownProvider { name });
    }

    let mut spec = builtin.unwrap_or_default();
    if let Some(city_spec) = city {
        overlay_spec(&mut spec, city_spec);
    }

    let command = spec.command.clone().unwrap_or_default();
    // A city entry that only adjusts args (no command of its own) is
    // trusted without a PATH probe.
    let args_only_city = city.is_some_and(|c| c.command.is_none());
    if !args_only_city && !look_path(&command) {
        return Err(ConfigError::ProviderBinaryMissing { name, command });
    }

    let mut resolved = ResolvedProvider {
        name,
        command,
        args: spec.args.unwrap_or_default(),
        env: spec.env,
        prompt_mode: spec.prompt_mode.unwrap_or(PromptMode::Arg),
        prompt_flag: spec.prompt_flag,
        ready_delay_ms: spec.ready_delay_ms.unwrap_or(0),
        ready_prompt_prefix: spec.ready_prompt_prefix,
        process_names: spec.process_names.unwrap_or_default(),
        emits_permission_warning: spec.emits_permission_warning.unwrap_or(false),
    };
    apply_agent_overrides(&mut resolved, agent);
    Ok(resolved)
}

fn start_command_provider(command: &str) -> ResolvedProvider {
    ResolvedProvider {
        command: command.to_string(),
        prompt_mode: PromptMode::Arg,
        ..Default::default()
    }
}

fn autodetect<F: Fn(&str) -> bool>(look_path: &F) -> Option<String> {
    for (name, spec) in builtin_providers() {
        if let Some(cmd) = &spec.command {
            if look_path(cmd) {
                return Some(name);
            }
        }
    }
    None
}

/// Overlay city-level fields onto a built-in spec: present fields
/// override, env merges additively with the overlay winning per key.
fn overlay_spec(base: &mut ProviderSpec, over: &ProviderSpec) {
    if let Some(v) = &over.display_name {
        base.display_name = Some(v.clone());
    }
    if let Some(v) = &over.command {
        base.command = Some(v.clone());
    }
    if let Some(v) = &over.args {
        base.args = Some(v.clone());
    }
    if let Some(v) = over.prompt_mode {
        base.prompt_mode = Some(v);
    }
    if let Some(v) = &over.prompt_flag {
        base.prompt_flag = Some(v.clone());
    }
    if let Some(v) = over.ready_delay_ms {
        base.ready_delay_ms = Some(v);
    }
    if let Some(v) = &over.ready_prompt_prefix {
        base.ready_prompt_prefix = Some(v.clone());
    }
    if let Some(v) = &over.process_names {
        base.process_names = Some(v.clone());
    }
    if let Some(v) = over.emits_permission_warning {
        base.emits_permission_warning = Some(v);
    }
    for (k, v) in &over.env {
        base.env.insert(k.clone(), v.clone());
    }
}

fn apply_agent_overrides(resolved: &mut ResolvedProvider, agent: &Agent) {
    if let Some(v) = &agent.args {
        resolved.args = v.clone();
    }
    if let Some(v) = agent.prompt_mode {
        resolved.prompt_mode = v;
    }
    if let Some(v) = &agent.prompt_flag {
        resolved.prompt_flag = Some(v.clone());
    }
    if let Some(v) = agent.ready_delay_ms {
        resolved.ready_delay_ms = v;
    }
    if let Some(v) = &agent.ready_prompt_prefix {
        resolved.ready_prompt_prefix = Some(v.clone());
    }
    if let Some(v) = &agent.process_names {
        resolved.process_names = v.clone();
    }
    if let Some(v) = agent.emits_permission_warning {
        resolved.emits_permission_warning = v;
    }
    for (k, v) in &agent.env {
        resolved.env.insert(k.clone(), v.clone());
    }
}

/// The install-hook list in effect for an agent: its own when set, else
/// the workspace's.
pub fn resolve_install_hooks(agent: &Agent, workspace: &Workspace) -> Vec<String> {
    agent
        .install_agent_hooks
        .clone()
        .or_else(|| workspace.install_agent_hooks.clone())
        .unwrap_or_default()
}

/// Whether an agent's workdir gets hooks installed. An explicit
/// `hooks_installed` wins; `claude` always has hooks; other providers
/// only when named in the effective install-hook list.
pub fn agent_has_hooks(agent: &Agent, workspace: &Workspace, provider_name: &str) -> bool {
    if let Some(v) = agent.hooks_installed {
        return v;
    }
    if provider_name == "claude" {
        return true;
    }
    resolve_install_hooks(agent, workspace)
        .iter()
        .any(|p| p == provider_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &str) -> bool {
        false
    }

    fn always(_: &str) -> bool {
        true
    }

    #[test]
    fn registry_order_is_pinned() {
        let names: Vec<String> = builtin_providers().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "claude", "codex", "gemini", "cursor", "copilot", "amp", "opencode", "auggie",
                "pi"
            ]
        );
    }

    #[test]
    fn registry_returns_fresh_copies() {
        let mut first = builtin_providers();
        first[0].1.command = Some("corrupted".to_string());
        let second = builtin_providers();
        assert_eq!(second[0].1.command.as_deref(), Some("claude"));
    }

    #[test]
    fn agent_start_command_short_circuits() {
        let agent = Agent {
            name: "a".to_string(),
            start_command: Some("./run.sh".to_string()),
            provider: "claude".to_string(),
            ..Default::default()
        };
        let resolved =
            resolve_provider(&agent, &Workspace::default(), &BTreeMap::new(), never).unwrap();
        assert_eq!(resolved.command, "./run.sh");
        assert_eq!(resolved.prompt_mode, PromptMode::Arg);
        assert!(resolved.name.is_empty());
    }

    #[test]
    fn workspace_start_command_escape_hatch() {
        let agent = Agent {
            name: "a".to_string(),
            ..Default::default()
        };
        let ws = Workspace {
            start_command: Some("tmux-runner".to_string()),
            ..Default::default()
        };
        let resolved = resolve_provider(&agent, &ws, &BTreeMap::new(), never).unwrap();
        assert_eq!(resolved.command, "tmux-runner");
    }

    #[test]
    fn autodetect_walks_registry_in_order() {
        let agent = Agent {
            name: "a".to_string(),
            ..Default::default()
        };
        let resolved = resolve_provider(&agent, &Workspace::default(), &BTreeMap::new(), |cmd| {
            cmd == "codex" || cmd == "gemini"
        })
        .unwrap();
        assert_eq!(resolved.name, "codex");
    }

    #[test]
    fn autodetect_finding_nothing_is_no_provider() {
        let agent = Agent {
            name: "a".to_string(),
            ..Default::default()
        };
        let err =
            resolve_provider(&agent, &Workspace::default(), &BTreeMap::new(), never).unwrap_err();
        assert!(matches!(err, ConfigError::NoProvider));
    }

    #[test]
    fn unknown_provider_name_rejected() {
        let agent = Agent {
            name: "a".to_string(),
            provider: "nonesuch".to_string(),
            ..Default::default()
        };
        let err =
            resolve_provider(&agent, &Workspace::default(), &BTreeMap::new(), always).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider { .. }));
    }

    #[test]
    fn missing_binary_rejected() {
        let agent = Agent {
            name: "a".to_string(),
            provider: "claude".to_string(),
            ..Default::default()
        };
        let err =
            resolve_provider(&agent, &Workspace::default(), &BTreeMap::new(), never).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ProviderBinaryMissing { ref command, .. } if command == "claude"
        ));
    }

    #[test]
    fn city_args_only_spec_skips_path_probe() {
        let agent = Agent {
            name: "a".to_string(),
            provider: "claude".to_string(),
            ..Default::default()
        };
        let city = BTreeMap::from([(
            "claude".to_string(),
            ProviderSpec {
                args: Some(vec!["--continue".to_string()]),
                ..Default::default()
            },
        )]);
        let resolved = resolve_provider(&agent, &Workspace::default(), &city, never).unwrap();
        assert_eq!(resolved.command, "claude");
        assert_eq!(resolved.args, vec!["--continue"]);
    }

    #[test]
    fn city_overlay_and_agent_overrides_stack() {
        let agent = Agent {
            name: "a".to_string(),
            provider: "claude".to_string(),
            ready_delay_ms: Some(9999),
            env: BTreeMap::from([("AGENT".to_string(), "1".to_string())]),
            ..Default::default()
        };
        let ws = Workspace::default();
        let city = BTreeMap::from([(
            "claude".to_string(),
            ProviderSpec {
                command: Some("claude-wrapper".to_string()),
                env: BTreeMap::from([("CITY".to_string(), "1".to_string())]),
                ..Default::default()
            },
        )]);
        let resolved =
            resolve_provider(&agent, &ws, &city, |cmd| cmd == "claude-wrapper").unwrap();
        assert_eq!(resolved.command, "claude-wrapper");
        assert_eq!(resolved.ready_delay_ms, 9999);
        assert_eq!(resolved.env.get("CITY").map(String::as_str), Some("1"));
        assert_eq!(resolved.env.get("AGENT").map(String::as_str), Some("1"));
        // Built-in fields survive underneath.
        assert!(resolved.emits_permission_warning);
    }

    #[test]
    fn prompt_mode_defaults_to_arg() {
        let agent = Agent {
            name: "a".to_string(),
            provider: "mystery".to_string(),
            ..Default::default()
        };
        let city = BTreeMap::from([(
            "mystery".to_string(),
            ProviderSpec {
                command: Some("mystery".to_string()),
                ..Default::default()
            },
        )]);
        let resolved = resolve_provider(&agent, &Workspace::default(), &city, always).unwrap();
        assert_eq!(resolved.prompt_mode, PromptMode::Arg);
    }

    #[test]
    fn install_hooks_agent_list_wins() {
        let ws = Workspace {
            install_agent_hooks: Some(vec!["codex".to_string()]),
            ..Default::default()
        };
        let agent = Agent {
            name: "a".to_string(),
            install_agent_hooks: Some(vec![]),
            ..Default::default()
        };
        assert!(resolve_install_hooks(&agent, &ws).is_empty());

        let plain = Agent {
            name: "b".to_string(),
            ..Default::default()
        };
        assert_eq!(resolve_install_hooks(&plain, &ws), vec!["codex"]);
    }

    #[test]
    fn claude_always_has_hooks() {
        let ws = Workspace {
            install_agent_hooks: Some(vec!["codex".to_string()]),
            ..Default::default()
        };
        let agent = Agent {
            name: "a".to_string(),
            ..Default::default()
        };
        assert!(agent_has_hooks(&agent, &ws, "claude"));
        assert!(agent_has_hooks(&agent, &ws, "codex"));
        assert!(!agent_has_hooks(&agent, &ws, "gemini"));
    }

    #[test]
    fn hooks_installed_override_wins() {
        let agent = Agent {
            name: "a".to_string(),
            hooks_installed: Some(false),
            ..Default::default()
        };
        assert!(!agent_has_hooks(&agent, &Workspace::default(), "claude"));
    }
}
