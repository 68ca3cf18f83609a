//! Error kinds surfaced by the composition pipeline.
//!
//! Composition is all-or-nothing: every error carries the offending
//! identity or path and aborts the load. Advisory collision messages go
//! to [`crate::provenance::Provenance::warnings`] instead and never
//! abort.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("fragment {} declares its own include list; includes do not nest", path.display())]
    NestedInclude { path: PathBuf },

    #[error("include '{reference}' not found at {}", path.display())]
    FragmentNotFound { reference: String, path: PathBuf },

    #[error("fetching topology '{name}' from {url}: {cause}")]
    TopologyFetch {
        name: String,
        url: String,
        cause: anyhow::Error,
    },

    #[error("topology include cycle: {} was already visited on this include chain", dir.display())]
    TopologyCycle { dir: PathBuf },

    #[error("topology {}: unsupported schema {schema} (this build supports up to {supported})", path.display())]
    UnsupportedSchema {
        path: PathBuf,
        schema: i64,
        supported: i64,
    },

    #[error("topology {}: missing [topology].name", path.display())]
    TopologyMissingName { path: PathBuf },

    #[error("topology {}: city_agents lists unknown agent '{name}'", dir.display())]
    UnknownCityAgent { dir: PathBuf, name: String },

    #[error("{scope}: duplicate agent '{name}' across topologies:\n  {}\n  {}", first.display(), second.display())]
    TopologyAgentCollision {
        /// "rig '<name>'" or "city scope".
        scope: String,
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("rig '{rig}': override targets unknown agent '{agent}'")]
    OverrideUnknown { rig: String, agent: String },

    #[error("{kind} patch target '{target}' not found")]
    PatchTargetMissing { kind: &'static str, target: String },

    #[error("duplicate agent '{name}' declared in:\n{sources}")]
    DuplicateAgent { name: String, sources: String },

    #[error("duplicate rig '{name}'")]
    DuplicateRig { name: String },

    #[error("rig '{rig}': bead prefix '{prefix}' collides with rig '{other}'")]
    DuplicateRigPrefix {
        rig: String,
        prefix: String,
        other: String,
    },

    #[error("rig '{rig}': bead prefix '{prefix}' collides with the HQ prefix for city '{city}'")]
    HqPrefixCollision {
        rig: String,
        prefix: String,
        city: String,
    },

    #[error("{entity}: missing required field '{field}'")]
    MissingRequired {
        entity: String,
        field: &'static str,
    },

    #[error("agent '{agent}': pool min {min} exceeds max {max}")]
    PoolRange { agent: String, min: u32, max: u32 },

    #[error("agent '{agent}': pooled agents must override both work_query and sling_query, or neither")]
    WorkQueryUnpaired { agent: String },

    #[error("unknown provider '{name}'")]
    UnknownProvider { name: String },

    #[error("provider '{name}': command '{command}' not found on PATH")]
    ProviderBinaryMissing { name: String, command: String },

    #[error("no provider configured and none of the built-in provider commands are on PATH")]
    NoProvider,
}

impl ConfigError {
    /// Wrap an IO error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a TOML decode error with the file that produced it.
    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        ConfigError::Parse {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
