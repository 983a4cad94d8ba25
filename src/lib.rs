//! Device hotplug watching for per-device renderers.
//!
//! A [`DeviceWatcher`] enumerates the devices present in the udev database,
//! then follows the hotplug event stream and reports devices as they are
//! added and removed. [`FilteredDeviceWatcher`] narrows what is reported to
//! devices matching a set of [`MatchCriteria`]. Renderer plugins register
//! in a [`RendererRegistry`] and are instantiated per reported device.

pub mod config;
pub mod database;
pub mod device;
pub mod error;
pub mod events;
pub mod filter;
pub mod host;
pub mod hotplug;
pub mod logging;
pub mod plugin;
pub mod plugins;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use database::{Action, DeviceDatabase, DeviceMonitor, Query, RawEvent};
pub use device::{Description, NativeDevice};
pub use error::{Error, Result};
pub use events::DeviceEvent;
pub use filter::{FilteredDeviceWatcher, MatchCriteria};
pub use hotplug::UdevDatabase;
pub use plugin::{RegistryBuilder, Renderer, RendererPlugin, RendererRegistry};
pub use watcher::{AcceptAll, DeviceFilter, DeviceObserver, DeviceWatcher};
