//! Attaches renderers to devices as the watcher reports them.

use crate::device::Description;
use crate::plugin::{PluginConfig, Renderer, RendererRegistry};
use crate::watcher::DeviceObserver;
use std::collections::HashMap;
use tracing::{info, warn};

/// Owns the renderers of every present device.
pub struct Host<'a> {
    registry: &'a RendererRegistry,
    renderers: Vec<PluginConfig>,
    attached: HashMap<String, Vec<Box<dyn Renderer>>>,
}

impl<'a> Host<'a> {
    /// Disabled renderer entries are dropped here.
    pub fn new(registry: &'a RendererRegistry, renderers: Vec<PluginConfig>) -> Self {
        let renderers = renderers.into_iter().filter(|r| r.enabled).collect();
        Self {
            registry,
            renderers,
            attached: HashMap::new(),
        }
    }

    pub fn device_count(&self) -> usize {
        self.attached.len()
    }

    pub fn renderers_for(&self, dev_path: &str) -> &[Box<dyn Renderer>] {
        self.attached.get(dev_path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Renderer entries that name an unregistered plugin.
    pub fn unknown_plugins(&self) -> Vec<&str> {
        self.renderers
            .iter()
            .map(|r| r.plugin.as_str())
            .filter(|name| !self.registry.contains(name))
            .collect()
    }
}

impl DeviceObserver for Host<'_> {
    fn device_added(&mut self, device: &Description) {
        info!("Device added: {} ({})", device.dev_path(), device.subsystem());

        let mut renderers = Vec::new();
        for config in &self.renderers {
            match self.registry.create(device, config) {
                Ok(renderer) => renderers.push(renderer),
                Err(e) => warn!(
                    "Renderer '{}' failed for {}: {:#}",
                    config.plugin,
                    device.dev_path(),
                    e
                ),
            }
        }
        self.attached.insert(device.dev_path().to_string(), renderers);
    }

    fn device_removed(&mut self, device: &Description) {
        info!("Device removed: {}", device.dev_path());

        if let Some(renderers) = self.attached.remove(device.dev_path()) {
            for mut renderer in renderers {
                renderer.device_removed();
            }
        }
    }
}
