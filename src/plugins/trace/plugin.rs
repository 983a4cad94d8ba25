//! Trace plugin implementation.

use crate::device::Description;
use crate::plugin::{PluginConfig, Renderer, RendererPlugin};
use std::any::Any;
use tracing::info;

/// Renderer that logs its device's lifecycle
pub struct TraceRenderer {
    dev_path: String,
    label: String,
}

impl TraceRenderer {
    pub fn dev_path(&self) -> &str {
        &self.dev_path
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Renderer for TraceRenderer {
    fn name(&self) -> &str {
        "trace"
    }

    fn device_removed(&mut self) {
        info!(label = %self.label, "Device gone: {}", self.dev_path);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Trace plugin
pub struct TracePlugin;

impl TracePlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererPlugin for TracePlugin {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn description(&self) -> &'static str {
        "Log device metadata when devices come and go"
    }

    fn create_renderer(
        &self,
        device: &Description,
        config: &PluginConfig,
    ) -> anyhow::Result<Box<dyn Renderer>> {
        let label = config.setting_str("label").unwrap_or("trace").to_string();

        info!(
            label = %label,
            subsystem = %device.subsystem(),
            devtype = %device.dev_type(),
            devnode = %device.dev_node(),
            driver = %device.driver(),
            "Device present: {}",
            device.dev_path()
        );
        if config.setting_bool("properties").unwrap_or(false) {
            for (key, value) in device.properties() {
                info!(label = %label, "  {}={}", key, value);
            }
        }
        if config.setting_bool("attributes").unwrap_or(false) {
            for (key, value) in device.attributes() {
                info!(label = %label, "  [{}] {}", key, value);
            }
        }

        Ok(Box::new(TraceRenderer {
            dev_path: device.dev_path().to_string(),
            label,
        }))
    }
}
