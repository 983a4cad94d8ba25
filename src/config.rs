use crate::filter::MatchCriteria;
use crate::plugin::PluginConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Current config schema version for future migration support
const CONFIG_VERSION: u32 = 1;

const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    #[serde(default = "default_version")]
    pub version: u32,
    /// Default log filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Which devices to watch
    #[serde(default, rename = "match")]
    pub matching: MatchConfig,
    /// Renderers instantiated for every matching device
    #[serde(default)]
    pub renderers: Vec<PluginConfig>,
}

fn default_version() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Device match criteria as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtype: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl MatchConfig {
    pub fn to_criteria(&self) -> MatchCriteria {
        let mut criteria = MatchCriteria::new();
        if let Some(subsystem) = &self.subsystem {
            criteria.set_subsystem(subsystem.as_str());
        }
        if let Some(devtype) = &self.devtype {
            criteria.set_dev_type(devtype.as_str());
        }
        for (key, value) in &self.properties {
            criteria.add_property(key.as_str(), value.as_str());
        }
        for tag in &self.tags {
            criteria.add_tag(tag.as_str());
        }
        for (key, value) in &self.attributes {
            criteria.add_attribute(key.as_str(), value.as_str());
        }
        criteria
    }
}

impl Default for Config {
    /// Watch hidraw devices and trace them.
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: default_log_level(),
            matching: MatchConfig {
                subsystem: Some("hidraw".to_string()),
                ..MatchConfig::default()
            },
            renderers: vec![PluginConfig::new("trace")],
        }
    }
}

/// Returns the path to the config file: ~/.config/{app_name}/{app_name}.toml
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
}

/// Load the config from the default location, or defaults if there is none.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) => load_or_default(&path),
        None => Ok(Config::default()),
    }
}

/// Load a config file, or return defaults if it doesn't exist.
/// If the file is corrupted, attempts to load from a `.bak` copy.
pub fn load_or_default(path: &Path) -> Result<Config> {
    let bak_path = path.with_extension("toml.bak");

    if !path.exists() {
        if bak_path.exists() {
            warn!("Main config missing, loading from backup: {}", bak_path.display());
            return load_from_path(&bak_path);
        }
        return Ok(Config::default());
    }

    match load_from_path(path) {
        Ok(config) => Ok(config),
        Err(e) => {
            if bak_path.exists() {
                warn!("Main config corrupted ({:#}), loading from backup", e);
                return load_from_path(&bak_path);
            }
            Err(e)
        }
    }
}

/// Load a config from a specific path
pub fn load_from_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    // Future: handle migrations based on config.version
    if config.version > CONFIG_VERSION {
        warn!(
            "Config version {} is newer than supported version {}",
            config.version, CONFIG_VERSION
        );
    }

    Ok(config)
}
