//! Name-keyed registry of renderer plugins.

use super::{PluginConfig, PluginInfo, Renderer, RendererPlugin};
use crate::device::Description;
use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

/// Collects plugins during startup.
///
/// Each name may be registered once. A second registration is a
/// programming error and is reported so startup can abort.
#[derive(Default)]
pub struct RegistryBuilder {
    plugins: HashMap<&'static str, Box<dyn RendererPlugin>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn RendererPlugin>) -> Result<&mut Self> {
        let name = plugin.name();
        if self.plugins.contains_key(name) {
            return Err(Error::DuplicatePlugin(name.to_string()));
        }
        debug!("Registered renderer plugin '{}'", name);
        self.plugins.insert(name, plugin);
        Ok(self)
    }

    /// Freeze the registry. No plugins can be added afterwards.
    pub fn build(self) -> RendererRegistry {
        RendererRegistry {
            plugins: self.plugins,
        }
    }
}

/// Read-only set of renderer plugins, passed by reference to whoever
/// needs to instantiate renderers.
pub struct RendererRegistry {
    plugins: HashMap<&'static str, Box<dyn RendererPlugin>>,
}

impl RendererRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&dyn RendererPlugin> {
        self.plugins.get(name).map(|plugin| &**plugin)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.plugins.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Information about all plugins, sorted by name.
    pub fn plugin_infos(&self) -> Vec<PluginInfo> {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(name))
            .map(|plugin| PluginInfo {
                name: plugin.name().to_string(),
                description: plugin.description().to_string(),
            })
            .collect()
    }

    /// Build a renderer for `device` with the plugin named in `config`.
    pub fn create(&self, device: &Description, config: &PluginConfig) -> anyhow::Result<Box<dyn Renderer>> {
        let plugin = self
            .get(&config.plugin)
            .ok_or_else(|| Error::UnknownPlugin(config.plugin.clone()))?;
        plugin.create_renderer(device, config)
    }
}
