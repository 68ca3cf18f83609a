//! Formula search layers.
//!
//! Consumers resolve a formula name by scanning an ordered directory
//! list and letting later entries shadow earlier ones. The city layer is
//! every city-topology `formulas/` directory followed by the city's own;
//! each rig extends the city layer with its topologies' directories and
//! its local one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{FormulaLayers, Rig};
use crate::paths::resolve_config_path;

/// Compute the per-scope layers. Rigs contributing nothing beyond the
/// city layer are omitted from the map.
pub fn compute_formula_layers(
    city_topology_dirs: &[PathBuf],
    city_local_dir: Option<&str>,
    rig_formula_dirs: &BTreeMap<String, Vec<PathBuf>>,
    rigs: &[Rig],
    city_root: &Path,
) -> FormulaLayers {
    let mut city: Vec<PathBuf> = Vec::new();
    for dir in city_topology_dirs {
        let formulas = dir.join("formulas");
        if formulas.is_dir() && !city.contains(&formulas) {
            city.push(formulas);
        }
    }
    if let Some(dir) = city_local_dir.filter(|d| !d.is_empty()) {
        let resolved = resolve_config_path(dir, city_root, city_root);
        if !city.contains(&resolved) {
            city.push(resolved);
        }
    }

    let mut rig_layers: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for rig in rigs {
        let mut layers = city.clone();
        if let Some(dirs) = rig_formula_dirs.get(&rig.name) {
            for dir in dirs {
                if !layers.contains(dir) {
                    layers.push(dir.clone());
                }
            }
        }
        if let Some(local) = rig.formula_dir.as_deref().filter(|d| !d.is_empty()) {
            let rig_base = resolve_config_path(&rig.path, city_root, city_root);
            let resolved = resolve_config_path(local, &rig_base, city_root);
            if !layers.contains(&resolved) {
                layers.push(resolved);
            }
        }
        if layers.len() > city.len() {
            rig_layers.insert(rig.name.clone(), layers);
        }
    }

    FormulaLayers {
        city,
        rigs: rig_layers,
    }
}
