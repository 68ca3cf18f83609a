//! Integration tests for post-composition validation.
//!
//! Duplicate identities (with contributing sources listed), bead prefix
//! rules against rigs and the HQ, and pool constraints, all exercised
//! through the full driver.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use gascity::{ComposeOptions, ConfigError, compose, derive_bead_prefix};

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

fn compose_err(city: &Path) -> ConfigError {
    compose(&city.join("city.toml"), &ComposeOptions::default()).unwrap_err()
}

#[test]
fn hq_prefix_collision_mentions_hq() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[workspace]
name = "my-city"

[[rigs]]
name = "my-cloud"
path = "rigs/my-cloud"
"#,
        &[],
    );
    assert_eq!(derive_bead_prefix("my-city"), derive_bead_prefix("my-cloud"));

    let err = compose_err(&city);
    let msg = err.to_string();
    assert!(msg.contains("collides"), "got: {msg}");
    assert!(msg.contains("HQ"), "got: {msg}");
}

#[test]
fn explicit_prefix_avoids_hq_collision() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[workspace]
name = "my-city"

[[rigs]]
name = "my-cloud"
path = "rigs/my-cloud"
prefix = "cloud"
"#,
        &[],
    );
    let (cfg, _) = compose(&city.join("city.toml"), &ComposeOptions::default()).unwrap();
    assert_eq!(cfg.rigs[0].prefix.as_deref(), Some("cloud"));
}

#[test]
fn duplicate_agent_across_fragments_lists_sources() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
include = ["teams/a.toml", "teams/b.toml"]
"#,
        &[
            ("teams/a.toml", "[[agents]]\nname = \"worker\"\ndir = \"hw\"\n"),
            ("teams/b.toml", "[[agents]]\nname = \"worker\"\ndir = \"hw\"\n"),
        ],
    );
    let err = compose_err(&city);
    let msg = err.to_string();
    assert!(msg.contains("hw/worker"), "got: {msg}");
    assert!(msg.contains("teams"), "got: {msg}");
    assert!(matches!(err, ConfigError::DuplicateAgent { .. }));
}

#[test]
fn duplicate_rig_rejected() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[[rigs]]
name = "hw"
path = "rigs/hw"
prefix = "aa"

[[rigs]]
name = "hw"
path = "rigs/hw2"
prefix = "bb"
"#,
        &[],
    );
    assert!(matches!(compose_err(&city), ConfigError::DuplicateRig { .. }));
}

#[test]
fn rig_prefix_collision_between_rigs() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[[rigs]]
name = "gas-works"
path = "rigs/gas-works"

[[rigs]]
name = "great-wall"
path = "rigs/great-wall"
"#,
        &[],
    );
    let err = compose_err(&city);
    assert!(matches!(
        err,
        ConfigError::DuplicateRigPrefix { ref prefix, .. } if prefix == "gw"
    ));
}

#[test]
fn rig_without_path_rejected() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[[rigs]]
name = "hw"
"#,
        &[],
    );
    assert!(matches!(
        compose_err(&city),
        ConfigError::MissingRequired { field: "path", .. }
    ));
}

#[test]
fn pool_range_violation_through_driver() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[[agents]]
name = "crew"

[agents.pool]
min = 5
max = 2
"#,
        &[],
    );
    assert!(matches!(
        compose_err(&city),
        ConfigError::PoolRange { min: 5, max: 2, .. }
    ));
}

#[test]
fn pooled_agent_single_query_override_rejected() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[[agents]]
name = "crew"
work_query = "custom"

[agents.pool]
min = 1
max = 4
"#,
        &[],
    );
    assert!(matches!(
        compose_err(&city),
        ConfigError::WorkQueryUnpaired { .. }
    ));
}

#[test]
fn pooled_agent_paired_queries_accepted() {
    let tmp = TempDir::new().unwrap();
    let city = setup_city(
        &tmp,
        r#"
[[agents]]
name = "crew"
work_query = "custom"
sling_query = "custom-sling"

[agents.pool]
min = 1
max = 4
"#,
        &[],
    );
    let (cfg, _) = compose(&city.join("city.toml"), &ComposeOptions::default()).unwrap();
    let crew = cfg.agent("", "crew").unwrap();
    assert_eq!(crew.effective_work_query(), "custom");
    assert_eq!(crew.effective_sling_query(), "custom-sling");
}
