//! TOML parsing with a defined-key set.
//!
//! Merging needs to distinguish "the fragment set this field to its zero
//! value" from "the fragment never mentioned it". Typed structs lose
//! that distinction, so parsing walks the raw `toml::Value` tree once
//! and records every syntactically-present key path.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::config::CityConfig;
use crate::error::ConfigError;

/// Every key path (dot-joined) that was present in a document, even when
/// bound to a zero value. Array keys are recorded but not descended into.
#[derive(Debug, Clone, Default)]
pub struct DefinedKeys(BTreeSet<String>);

impl DefinedKeys {
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build the set from a parsed TOML value tree.
    pub fn from_value(value: &toml::Value) -> Self {
        let mut keys = BTreeSet::new();
        record_keys(value, "", &mut keys);
        DefinedKeys(keys)
    }
}

/// Walk a TOML value tree and record every key path found in it.
fn record_keys(value: &toml::Value, prefix: &str, keys: &mut BTreeSet<String>) {
    if let toml::Value::Table(table) = value {
        for (key, v) in table {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            if let toml::Value::Table(_) = v {
                keys.insert(full_key.clone());
                record_keys(v, &full_key, keys);
            } else {
                keys.insert(full_key);
            }
        }
    }
}

/// Parse a manifest (root or fragment) from text.
///
/// Unknown keys are accepted; TOML syntax or type errors surface as
/// [`ConfigError::Parse`] tagged with `path`.
pub fn parse_config(text: &str, path: &Path) -> Result<(CityConfig, DefinedKeys), ConfigError> {
    let value: toml::Value = text
        .parse()
        .map_err(|e| ConfigError::parse(path, e))?;
    let defined = DefinedKeys::from_value(&value);
    let config: CityConfig = value
        .try_into()
        .map_err(|e| ConfigError::parse(path, e))?;
    Ok((config, defined))
}

/// Read and parse a manifest file.
pub fn load_config(path: &Path) -> Result<(CityConfig, DefinedKeys), ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    parse_config(&text, path)
}
