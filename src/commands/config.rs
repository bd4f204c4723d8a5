//! `th config get/set/list`.

use serde::Serialize;
use std::fmt::Write as _;

use super::{Output, json_of};
use crate::config::{ConfigOverrides, KEYS, ValueSource, resolve_config};
use crate::storage::Storage;
use crate::{Error, Result};

/// One resolved key.
#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: ValueSource,
}

impl Output for ConfigEntry {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!("{} = {} ({})", self.key, self.value, self.source)
    }
}

pub fn config_get(storage: &Storage, key: &str) -> Result<ConfigEntry> {
    let resolved = resolve_config(storage, &ConfigOverrides::default())?;
    let (value, source) = resolved
        .describe(key)
        .ok_or_else(|| Error::Config(format!("Unknown config key: {}", key)))?;
    Ok(ConfigEntry {
        key: key.to_string(),
        value,
        source,
    })
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: String,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path)
    }
}

/// Set a key in the repository's session config.kdl.
pub fn config_set(storage: &Storage, key: &str, value: &str) -> Result<ConfigSet> {
    let mut config = storage.read_config()?;
    config.set(key, value).map_err(Error::Config)?;
    storage.write_config(&config)?;

    let stored = config.get(key).map_err(Error::Config)?.unwrap_or_default();
    Ok(ConfigSet {
        key: key.to_string(),
        value: stored,
        path: storage.config_path().display().to_string(),
    })
}

#[derive(Serialize)]
pub struct ConfigList {
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.to_human());
        }
        out.trim_end().to_string()
    }
}

pub fn config_list(storage: &Storage) -> Result<ConfigList> {
    let resolved = resolve_config(storage, &ConfigOverrides::default())?;
    let entries = KEYS
        .iter()
        .filter_map(|key| {
            resolved.describe(key).map(|(value, source)| ConfigEntry {
                key: key.to_string(),
                value,
                source,
            })
        })
        .collect();
    Ok(ConfigList { entries })
}
