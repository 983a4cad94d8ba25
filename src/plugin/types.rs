//! Plugin configuration and listing types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-renderer configuration from the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Registered plugin name
    pub plugin: String,
    /// Whether renderers are created for this entry
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Plugin-specific settings (e.g., log level for the trace renderer)
    #[serde(flatten)]
    pub settings: HashMap<String, toml::Value>,
}

fn default_enabled() -> bool {
    true
}

impl PluginConfig {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            enabled: true,
            settings: HashMap::new(),
        }
    }

    /// String setting, if present and a string.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(toml::Value::as_str)
    }

    pub fn setting_bool(&self, key: &str) -> Option<bool> {
        self.settings.get(key).and_then(toml::Value::as_bool)
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Information about a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Unique plugin name
    pub name: String,
    /// Short description of what the plugin does
    pub description: String,
}
