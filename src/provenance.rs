//! Provenance: which source file produced each composed value.
//!
//! The tracker is threaded through every merge and expansion so that
//! downstream tooling (doctor, config-show) can answer "where did this
//! agent come from?" and render collision warnings with both sides
//! named.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Entity-to-source mapping plus accumulated advisory warnings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    /// The root manifest path.
    pub root: PathBuf,

    /// All contributing files: the root first, then includes in
    /// declaration order.
    pub sources: Vec<PathBuf>,

    /// Qualified agent name → declaring file.
    pub agents: BTreeMap<String, PathBuf>,

    /// Rig name → declaring file.
    pub rigs: BTreeMap<String, PathBuf>,

    /// Workspace field name → declaring file.
    pub workspace: BTreeMap<String, PathBuf>,

    /// Human-readable collision warnings. Advisory only; they never
    /// abort composition.
    pub warnings: Vec<String>,
}

impl Provenance {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Provenance {
            sources: vec![root.clone()],
            root,
            ..Default::default()
        }
    }

    /// Register an include fragment, in declaration order.
    pub fn add_source(&mut self, path: impl Into<PathBuf>) {
        self.sources.push(path.into());
    }

    pub fn record_agent(&mut self, qualified_name: impl Into<String>, source: &Path) {
        self.agents.insert(qualified_name.into(), source.to_path_buf());
    }

    pub fn record_rig(&mut self, name: impl Into<String>, source: &Path) {
        self.rigs.insert(name.into(), source.to_path_buf());
    }

    pub fn record_workspace_field(&mut self, field: impl Into<String>, source: &Path) {
        self.workspace.insert(field.into(), source.to_path_buf());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn agent_source(&self, qualified_name: &str) -> Option<&Path> {
        self.agents.get(qualified_name).map(PathBuf::as_path)
    }

    pub fn rig_source(&self, name: &str) -> Option<&Path> {
        self.rigs.get(name).map(PathBuf::as_path)
    }

    pub fn workspace_field_source(&self, field: &str) -> Option<&Path> {
        self.workspace.get(field).map(PathBuf::as_path)
    }
}
