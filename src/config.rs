//! The composed city configuration tree.
//!
//! A [`CityConfig`] is assembled once per load by the composition driver:
//! the root manifest is parsed, include fragments are merged in, topology
//! bundles are expanded, patches are applied, and derived fields (formula
//! layers, topology directories) are filled. Callers treat the returned
//! value as immutable; a reload re-runs the whole pipeline.
//!
//! Every overridable scalar on patch/override types is an `Option` so
//! "set to the zero value" stays distinguishable from "not set".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityConfig {
    #[serde(default, skip_serializing_if = "Workspace::is_empty")]
    pub workspace: Workspace,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<Agent>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rigs: Vec<Rig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, ProviderSpec>,

    /// Named topology sources, usable as nicknames in `topology` fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub topologies: BTreeMap<String, TopologySource>,

    // Opaque sub-configs: schema owned by other subsystems, merged
    // last-writer-wins at table level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beads: Option<toml::Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dolt: Option<toml::Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<toml::Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<toml::Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<toml::Table>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<toml::Table>,

    #[serde(default, skip_serializing_if = "FormulasConfig::is_empty")]
    pub formulas: FormulasConfig,

    /// Ordered include references. Only valid on the root manifest;
    /// cleared once the fragments are merged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Late-stage patch staging area, cleared after application.
    #[serde(default, skip_serializing_if = "Patches::is_empty")]
    pub patches: Patches,

    /// Derived: per-scope ordered formula search layers.
    #[serde(skip)]
    pub formula_layers: FormulaLayers,

    /// Derived: city-topology directories in expansion order.
    #[serde(skip)]
    pub topology_dirs: Vec<PathBuf>,

    /// Derived: deduped `prompts/shared/` directories discovered across
    /// all expanded topologies.
    #[serde(skip)]
    pub topology_shared_dirs: Vec<PathBuf>,
}

impl CityConfig {
    /// Pretty-printed TOML rendition of the declarative surface.
    /// Derived fields are skipped; empty optionals are omitted.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Look up an agent by its `(dir, name)` identity.
    pub fn agent(&self, dir: &str, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.dir == dir && a.name == name)
    }

    /// Look up a rig by name.
    pub fn rig(&self, name: &str) -> Option<&Rig> {
        self.rigs.iter().find(|r| r.name == name)
    }
}

/// Workspace-level settings from `[workspace]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Escape hatch: a raw start command used instead of provider
    /// resolution for agents that don't name a provider themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,

    /// Template for session names handed to the supervisor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,

    /// Providers whose hooks get installed into agent workdirs.
    /// `None` means "not set" and falls back per agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_agent_hooks: Option<Vec<String>>,

    /// Singular city topology reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topology: String,

    /// Plural city topology references, applied after `topology`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub city_topologies: Vec<String>,

    /// Additional topology references, applied last.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
}

impl Workspace {
    pub fn is_empty(&self) -> bool {
        self == &Workspace::default()
    }
}

/// How a provider receives its prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Prompt passed as a positional argument.
    Arg,
    /// Prompt passed behind `prompt_flag`.
    Flag,
    /// Prompt not passed on the command line.
    None,
}

impl Default for PromptMode {
    fn default() -> Self {
        PromptMode::Arg
    }
}

impl std::fmt::Display for PromptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptMode::Arg => write!(f, "arg"),
            PromptMode::Flag => write!(f, "flag"),
            PromptMode::None => write!(f, "none"),
        }
    }
}

/// A named participant in the city.
///
/// Identity is the pair `(dir, name)`; an empty `dir` means the agent is
/// city-scoped rather than attached to a rig.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt_template: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    /// Escape hatch: run this command verbatim instead of resolving a
    /// provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,

    // Per-agent provider field overrides. All absent-distinguishable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_mode: Option<PromptMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_prompt_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emits_permission_warning: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<Pool>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub suspended: bool,

    /// Idle timeout before the supervisor reaps the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_agent_hooks: Option<Vec<String>>,

    /// Overrides hook detection entirely when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks_installed: Option<bool>,

    /// Commands run before the agent session starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_start: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_setup_script: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub overlay_dir: String,

    /// Scope marker: "city", "rig", or "" (unscoped).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sling_query: Option<String>,

    /// The directory the agent's declaration lives in. Stamped by the
    /// loaders for provenance; never read from TOML.
    #[serde(skip)]
    pub source_dir: PathBuf,
}

impl Agent {
    /// `name` for city-scoped agents, `dir/name` otherwise.
    pub fn qualified_name(&self) -> String {
        if self.dir.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.dir, self.name)
        }
    }

    pub fn is_city_scoped(&self) -> bool {
        self.dir.is_empty()
    }

    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// The work query actually used: the user-supplied value verbatim,
    /// else a default keyed on the qualified name and pool status.
    pub fn effective_work_query(&self) -> String {
        if let Some(q) = &self.work_query {
            return q.clone();
        }
        if self.is_pooled() {
            format!("pool:{}", self.qualified_name())
        } else {
            format!("owner:{}", self.qualified_name())
        }
    }

    /// The sling query actually used.
    pub fn effective_sling_query(&self) -> String {
        match &self.sling_query {
            Some(q) => q.clone(),
            None => format!("sling:{}", self.qualified_name()),
        }
    }
}

/// A parameterized group of interchangeable agents sharing a work query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    #[serde(default)]
    pub min: u32,

    /// `max == 0` is legal and means the pool is disabled.
    #[serde(default)]
    pub max: u32,

    /// Shell command used to probe pool health. Opaque to composition.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub check: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_timeout_ms: Option<u64>,
}

/// A named working directory with its own topology and agent set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rig {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Explicit bead prefix; suppresses derivation from the rig name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub suspended: bool,

    /// Singular topology reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topology: String,

    /// Plural topology references, applied after `topology`.
    #[serde(default, rename = "topologies", skip_serializing_if = "Vec::is_empty")]
    pub rig_topologies: Vec<String>,

    /// Additional topology references, applied last.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// Ordered per-agent overrides against the referenced topologies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<AgentOverride>,

    /// Rig-local formula directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_dir: Option<String>,
}

/// A named external agent-CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_mode: Option<PromptMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_prompt_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emits_permission_warning: Option<bool>,
}

/// Where a named topology comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySource {
    /// Remote URL or local path.
    pub source: String,

    /// Branch, tag, or commit to pin.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Subpath within the fetched tree holding the topology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// `[formulas]`: local formula directory plus periodic formula schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulasConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub periodic: Vec<PeriodicFormula>,
}

impl FormulasConfig {
    pub fn is_empty(&self) -> bool {
        self.dir.is_none() && self.periodic.is_empty()
    }
}

/// A formula run on a schedule by the daemon. Opaque to composition
/// beyond carrying it through merges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodicFormula {
    #[serde(default)]
    pub name: String,

    /// Interval expression, e.g. "30m". Interpreted by the daemon.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,

    /// Optional rig scope; city-wide when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rig: Option<String>,
}

/// Derived formula search layers, lowest priority first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaLayers {
    pub city: Vec<PathBuf>,
    pub rigs: BTreeMap<String, Vec<PathBuf>>,
}

// ---------------------------------------------------------------------------
// Patches and overrides
// ---------------------------------------------------------------------------

/// Late-stage patch staging area from `[patches]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patches {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentPatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rigs: Vec<RigPatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderPatch>,
}

impl Patches {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.rigs.is_empty() && self.providers.is_empty()
    }
}

/// The editable field set shared by agent patches and rig overrides.
/// Scalars are optional, slices replace entirely when set, `env` merges
/// additively with `env_remove` applied afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_mode: Option<PromptMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_prompt_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emits_permission_warning: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_remove: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolEdit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_agent_hooks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks_installed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_start: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_setup_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sling_query: Option<String>,
}

impl AgentEdit {
    /// Apply the edit to a target agent: set fields present in the edit,
    /// replace slices, merge `env` additively, then delete `env_remove`
    /// keys. A pool edit creates the pool when the target has none.
    pub fn apply_to(&self, agent: &mut Agent) {
        if let Some(v) = &self.prompt_template {
            agent.prompt_template = v.clone();
        }
        if let Some(v) = &self.provider {
            agent.provider = v.clone();
        }
        if let Some(v) = &self.start_command {
            agent.start_command = Some(v.clone());
        }
        if let Some(v) = &self.args {
            agent.args = Some(v.clone());
        }
        if let Some(v) = self.prompt_mode {
            agent.prompt_mode = Some(v);
        }
        if let Some(v) = &self.prompt_flag {
            agent.prompt_flag = Some(v.clone());
        }
        if let Some(v) = self.ready_delay_ms {
            agent.ready_delay_ms = Some(v);
        }
        if let Some(v) = &self.ready_prompt_prefix {
            agent.ready_prompt_prefix = Some(v.clone());
        }
        if let Some(v) = &self.process_names {
            agent.process_names = Some(v.clone());
        }
        if let Some(v) = self.emits_permission_warning {
            agent.emits_permission_warning = Some(v);
        }
        for (k, v) in &self.env {
            agent.env.insert(k.clone(), v.clone());
        }
        for k in &self.env_remove {
            agent.env.remove(k);
        }
        if let Some(pool_edit) = &self.pool {
            let pool = agent.pool.get_or_insert_with(Pool::default);
            pool_edit.apply_to(pool);
        }
        if let Some(v) = self.suspended {
            agent.suspended = v;
        }
        if let Some(v) = self.idle_timeout_ms {
            agent.idle_timeout_ms = Some(v);
        }
        if let Some(v) = &self.install_agent_hooks {
            agent.install_agent_hooks = Some(v.clone());
        }
        if let Some(v) = self.hooks_installed {
            agent.hooks_installed = Some(v);
        }
        if let Some(v) = &self.pre_start {
            agent.pre_start = v.clone();
        }
        if let Some(v) = &self.session_setup_script {
            agent.session_setup_script = v.clone();
        }
        if let Some(v) = &self.overlay_dir {
            agent.overlay_dir = v.clone();
        }
        if let Some(v) = &self.work_query {
            agent.work_query = Some(v.clone());
        }
        if let Some(v) = &self.sling_query {
            agent.sling_query = Some(v.clone());
        }
    }
}

/// Per-field pool edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_timeout_ms: Option<u64>,
}

impl PoolEdit {
    pub fn apply_to(&self, pool: &mut Pool) {
        if let Some(v) = self.min {
            pool.min = v;
        }
        if let Some(v) = self.max {
            pool.max = v;
        }
        if let Some(v) = &self.check {
            pool.check = v.clone();
        }
        if let Some(v) = self.drain_timeout_ms {
            pool.drain_timeout_ms = Some(v);
        }
    }
}

/// A rig-level override of one topology agent, keyed by the agent's name
/// within the referenced topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentOverride {
    pub agent: String,
    #[serde(flatten)]
    pub edit: AgentEdit,
}

/// `[[patches.agents]]`: targets an agent by `(dir, name)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPatch {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,
    pub name: String,
    #[serde(flatten)]
    pub edit: AgentEdit,
}

impl AgentPatch {
    pub fn qualified_name(&self) -> String {
        if self.dir.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.dir, self.name)
        }
    }
}

/// `[[patches.rigs]]`: targets a rig by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigPatch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,
    #[serde(default, rename = "topologies", skip_serializing_if = "Option::is_none")]
    pub rig_topologies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_dir: Option<String>,
}

/// `[[patches.providers]]`: targets a provider by name. With
/// `replace = true` the target is rebuilt from only the patch's set
/// fields; otherwise fields deep-merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderPatch {
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replace: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_remove: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_mode: Option<PromptMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_prompt_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emits_permission_warning: Option<bool>,
}
