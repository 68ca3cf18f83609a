pub mod compose;
pub mod config;
pub mod error;
pub mod expand;
pub mod fetch;
pub mod formula;
pub mod lock;
pub mod merge;
pub mod parser;
pub mod patch;
pub mod paths;
pub mod provenance;
pub mod provider;
pub mod revision;
pub mod topology;
pub mod validate;

pub use compose::{ComposeOptions, compose};
pub use config::{
    Agent, AgentEdit, AgentOverride, AgentPatch, CityConfig, FormulaLayers, FormulasConfig,
    Patches, PeriodicFormula, Pool, PoolEdit, PromptMode, ProviderPatch, ProviderSpec, Rig,
    RigPatch, TopologySource, Workspace,
};
pub use error::ConfigError;
pub use expand::{effective_city_topologies, effective_rig_topologies, resolve_topology_ref};
pub use fetch::{SourceRef, fetch_topologies, is_remote, parse_source_ref, topology_cache_path};
pub use formula::compute_formula_layers;
pub use lock::{LockEntry, TopologyLock, lock_path, read_lock, write_lock};
pub use parser::{DefinedKeys, load_config, parse_config};
pub use provenance::Provenance;
pub use provider::{
    ResolvedProvider, agent_has_hooks, builtin_providers, resolve_install_hooks, resolve_provider,
};
pub use revision::{hash_dir, revision, short_hash, watch_dirs};
pub use topology::{CURRENT_SCHEMA, TopologyBundle, load_topology};
pub use validate::{derive_bead_prefix, effective_rig_prefix, validate};
