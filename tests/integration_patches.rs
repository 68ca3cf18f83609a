//! Integration tests for late-stage patches through the full driver.
//!
//! Patches accumulate from the root and fragments, apply after merge
//! and city expansion, and are intentional: no collision warnings, but
//! a missing target is a hard error.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use gascity::{ComposeOptions, ConfigError, compose};

fn setup_city(tmp: &TempDir, root_toml: &str, files: &[(&str, &str)]) -> PathBuf {
    let city = tmp.path().join("city");
    fs::create_dir_all(&city).unwrap();
    fs::write(city.join("city.toml"), root_toml).unwrap();
    for (rel, contents) in files {
        let path = city.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    city
}

fn compose_city(city: &Path) -> (gascity::CityConfig, gascity::Provenance) {
    compose(&city.join("city.toml"), &ComposeOptions::default()).unwrap()
}

#[test]
fn patch_targeting_missing_agent_fails() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[[agents]]
name = "mayor"

[[patches.agents]]
dir = "hw"
name = "ghost"
suspended = true
"#,
        &[],
    );
    let err = compose(&city.join("city.toml"), &ComposeOptions::default()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("hw/ghost"), "got: {msg}");
    assert!(msg.contains("not found"), "got: {msg}");
}

#[test]
fn fragment_patches_apply_after_merge() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
include = ["ops/tweaks.toml"]

[[agents]]
name = "mayor"

[[agents]]
name = "worker"
dir = "hw"

[agents.env]
MODE = "normal"
"#,
        &[(
            "ops/tweaks.toml",
            r#"
[[patches.agents]]
dir = "hw"
name = "worker"
idle_timeout_ms = 60000

[patches.agents.env]
MODE = "patched"
EXTRA = "1"
"#,
        )],
    );
    let (cfg, prov) = compose_city(&city);

    let worker = cfg.agent("hw", "worker").unwrap();
    assert_eq!(worker.idle_timeout_ms, Some(60000));
    assert_eq!(worker.env.get("MODE").map(String::as_str), Some("patched"));
    assert_eq!(worker.env.get("EXTRA").map(String::as_str), Some("1"));
    // Patches are intentional edits: no warnings.
    assert!(prov.warnings.is_empty(), "warnings: {:?}", prov.warnings);
    assert!(cfg.patches.is_empty());
}

#[test]
fn patch_can_target_city_topology_agent() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[workspace]
topology = "topologies/core"

[[patches.agents]]
name = "dispatch"
suspended = true
"#,
        &[(
            "topologies/core/topology.toml",
            r#"
[topology]
name = "core"
schema = 1

[[agents]]
name = "dispatch"
"#,
        )],
    );
    let (cfg, _) = compose_city(&city);
    assert!(cfg.agent("", "dispatch").unwrap().suspended);
}

#[test]
fn rig_patch_retargets_topology_before_expansion() {
    let tmp = TempDir::new().unwrap();
    let topo = |name: &str, agent: &str| {
        format!("[topology]\nname = \"{name}\"\nschema = 1\n\n[[agents]]\nname = \"{agent}\"\n")
    };
    let city = setup_city(
        &tmp,
        r#"
[[rigs]]
name = "hw"
path = "rigs/hw"
topology = "topologies/old"

[[patches.rigs]]
name = "hw"
topology = "topologies/new"
"#,
        &[
            ("topologies/old/topology.toml", &topo("old", "old-agent")),
            ("topologies/new/topology.toml", &topo("new", "new-agent")),
        ],
    );
    let (cfg, _) = compose_city(&city);

    // The patch lands before rig expansion, so the new topology is the
    // one that expands.
    assert!(cfg.agent("hw", "new-agent").is_some());
    assert!(cfg.agent("hw", "old-agent").is_none());
}

#[test]
fn provider_patch_replace_through_driver() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[providers.custom]
command = "my-agent"
ready_delay_ms = 5000

[providers.custom.env]
OLD = "1"

[[patches.providers]]
name = "custom"
replace = true
command = "rebuilt-agent"
prompt_mode = "flag"
prompt_flag = "--prompt"
"#,
        &[],
    );
    let (cfg, _) = compose_city(&city);
    let spec = cfg.providers.get("custom").unwrap();
    assert_eq!(spec.command.as_deref(), Some("rebuilt-agent"));
    assert_eq!(spec.prompt_mode, Some(gascity::PromptMode::Flag));
    assert_eq!(spec.prompt_flag.as_deref(), Some("--prompt"));
    assert_eq!(spec.ready_delay_ms, None);
    assert!(spec.env.is_empty());
}

#[test]
fn provider_patch_missing_target_fails() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[[patches.providers]]
name = "ghost"
command = "x"
"#,
        &[],
    );
    let err = compose(&city.join("city.toml"), &ComposeOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::PatchTargetMissing {
            kind: "provider",
            ..
        }
    ));
}
