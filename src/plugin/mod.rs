//! Renderer plugin system.
//!
//! Plugins register under a unique name and build one renderer per device
//! when the watcher reports that device. The registry is assembled once at
//! startup and is read-only afterwards.

pub mod registry;
pub mod types;

pub use registry::{RegistryBuilder, RendererRegistry};
pub use types::{PluginConfig, PluginInfo};

use crate::device::Description;
use std::any::Any;

/// Behavior attached to one device.
pub trait Renderer {
    /// Name of the plugin that created this renderer.
    fn name(&self) -> &str;

    /// Called once when the device disappears, before the renderer is dropped.
    fn device_removed(&mut self) {}

    /// Get renderer-specific state as Any for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Factory for renderers, registered by name.
pub trait RendererPlugin {
    /// Unique name used in configuration files (e.g., "trace")
    fn name(&self) -> &'static str;

    /// Short description of what the renderers do
    fn description(&self) -> &'static str {
        ""
    }

    /// Build a renderer for `device`.
    fn create_renderer(
        &self,
        device: &Description,
        config: &PluginConfig,
    ) -> anyhow::Result<Box<dyn Renderer>>;
}
