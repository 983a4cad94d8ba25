//! Read-only snapshots of devices reported by the device database.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::io;

pub type PropertyMap = BTreeMap<String, String>;
pub type TagList = Vec<String>;
pub type AttributeMap = BTreeMap<String, String>;

/// One native device handle owned by the device database.
///
/// Implementations wrap a reference-counted native object. `duplicate`
/// must take a new reference rather than alias the existing one, so that
/// every [`Description`] can release its handle independently.
pub trait NativeDevice: fmt::Debug {
    /// Kernel device path. `None` or empty marks an unusable handle.
    fn dev_path(&self) -> Option<String>;
    fn subsystem(&self) -> Option<String>;
    fn dev_type(&self) -> Option<String>;
    fn sys_path(&self) -> String;
    fn sys_name(&self) -> String;
    fn sys_num(&self) -> Option<String>;
    fn dev_node(&self) -> Option<String>;
    fn driver(&self) -> Option<String>;
    fn is_initialized(&self) -> bool;
    fn seq_num(&self) -> u64;
    fn usec_since_initialized(&self) -> u64;

    fn properties(&self) -> io::Result<PropertyMap>;
    fn tags(&self) -> io::Result<TagList>;
    fn attributes(&self) -> io::Result<AttributeMap>;

    /// Immediate parent, `None` at the root of the device tree.
    fn parent(&self) -> Option<Box<dyn NativeDevice>>;

    /// Devices below this one whose subsystem is `subsystem`, excluding
    /// the device itself, in database enumeration order.
    fn descendants(&self, subsystem: &str) -> io::Result<Vec<Box<dyn NativeDevice>>>;

    fn duplicate(&self) -> Box<dyn NativeDevice>;
}

/// Snapshot of one device's metadata.
///
/// Properties, tags and attributes are read once at construction, so
/// accessors never touch the database. Hierarchy queries do, and may
/// return fresh data on every call.
pub struct Description {
    device: Box<dyn NativeDevice>,
    dev_path: String,
    properties: PropertyMap,
    tags: TagList,
    attributes: AttributeMap,
}

impl Description {
    /// Build a description from a native handle.
    pub fn new(device: Box<dyn NativeDevice>) -> Result<Self> {
        let dev_path = device
            .dev_path()
            .filter(|path| !path.is_empty())
            .ok_or_else(|| Error::InvalidDevice("device has no devpath".to_string()))?;

        let invalid = |what: &str, err: io::Error| {
            Error::InvalidDevice(format!("{}: failed to read {}: {}", dev_path, what, err))
        };
        let properties = device.properties().map_err(|e| invalid("properties", e))?;
        let tags = device.tags().map_err(|e| invalid("tags", e))?;
        let attributes = device.attributes().map_err(|e| invalid("attributes", e))?;

        Ok(Self {
            device,
            dev_path,
            properties,
            tags,
            attributes,
        })
    }

    /// Build a description from a handle that may be null.
    pub fn from_handle(device: Option<Box<dyn NativeDevice>>) -> Result<Self> {
        match device {
            Some(device) => Self::new(device),
            None => Err(Error::InvalidDevice("null device handle".to_string())),
        }
    }

    pub fn parent(&self) -> Result<Description> {
        let parent = self.device.parent().ok_or(Error::NoSuchDevice)?;
        Description::new(parent)
    }

    /// Nearest ancestor whose subsystem and device type both match exactly.
    pub fn parent_with_type(&self, subsystem: &str, dev_type: &str) -> Result<Description> {
        let mut current = self.device.parent();
        while let Some(device) = current {
            if device.subsystem().as_deref() == Some(subsystem)
                && device.dev_type().as_deref() == Some(dev_type)
            {
                return Description::new(device);
            }
            current = device.parent();
        }
        Err(Error::NoSuchDevice)
    }

    /// Descendants in `subsystem`, materialized lazily as the iterator
    /// advances. Handles that cannot be described are skipped.
    pub fn descendants_with_type(
        &self,
        subsystem: &str,
    ) -> Result<impl Iterator<Item = Description>> {
        let devices = self
            .device
            .descendants(subsystem)
            .map_err(|e| Error::connection("failed to enumerate descendants", e))?;

        Ok(devices.into_iter().filter_map(|device| match Description::new(device) {
            Ok(description) => Some(description),
            Err(e) => {
                tracing::warn!("Skipping descendant: {}", e);
                None
            }
        }))
    }

    pub fn dev_path(&self) -> &str {
        &self.dev_path
    }

    pub fn subsystem(&self) -> String {
        self.device.subsystem().unwrap_or_default()
    }

    pub fn dev_type(&self) -> String {
        self.device.dev_type().unwrap_or_default()
    }

    pub fn sys_path(&self) -> String {
        self.device.sys_path()
    }

    pub fn sys_name(&self) -> String {
        self.device.sys_name()
    }

    pub fn sys_num(&self) -> String {
        self.device.sys_num().unwrap_or_default()
    }

    pub fn dev_node(&self) -> String {
        self.device.dev_node().unwrap_or_default()
    }

    pub fn driver(&self) -> String {
        self.device.driver().unwrap_or_default()
    }

    pub fn is_initialized(&self) -> bool {
        self.device.is_initialized()
    }

    pub fn seq_num(&self) -> u64 {
        self.device.seq_num()
    }

    pub fn usec_since_initialized(&self) -> u64 {
        self.device.usec_since_initialized()
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl Clone for Description {
    fn clone(&self) -> Self {
        Self {
            device: self.device.duplicate(),
            dev_path: self.dev_path.clone(),
            properties: self.properties.clone(),
            tags: self.tags.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Description")
            .field("dev_path", &self.dev_path)
            .field("subsystem", &self.subsystem())
            .field("dev_type", &self.dev_type())
            .field("dev_node", &self.dev_node())
            .finish()
    }
}

impl TryFrom<udev::Device> for Description {
    type Error = Error;

    fn try_from(device: udev::Device) -> Result<Self> {
        Description::new(Box::new(crate::hotplug::UdevDevice::new(device)))
    }
}
