//! Match criteria and the filtered watcher built on them.

use crate::database::{DeviceDatabase, Query};
use crate::device::{AttributeMap, Description, PropertyMap, TagList};
use crate::error::Result;
use crate::hotplug::UdevDatabase;
use crate::watcher::{DeviceFilter, DeviceWatcher};

/// Equality criteria a device must satisfy to be reported.
///
/// An unset criterion imposes no constraint. Tags must all be present;
/// properties and attributes must exist with exactly the given value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCriteria {
    pub subsystem: Option<String>,
    pub dev_type: Option<String>,
    pub properties: PropertyMap,
    pub tags: TagList,
    pub attributes: AttributeMap,
}

impl MatchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystem.is_none()
            && self.dev_type.is_none()
            && self.properties.is_empty()
            && self.tags.is_empty()
            && self.attributes.is_empty()
    }

    pub fn set_subsystem(&mut self, subsystem: impl Into<String>) -> &mut Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    pub fn set_dev_type(&mut self, dev_type: impl Into<String>) -> &mut Self {
        self.dev_type = Some(dev_type.into());
        self
    }

    /// Later values for the same key replace earlier ones.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, device: &Description) -> bool {
        if let Some(subsystem) = &self.subsystem {
            if device.subsystem() != *subsystem {
                return false;
            }
        }
        if let Some(dev_type) = &self.dev_type {
            if device.dev_type() != *dev_type {
                return false;
            }
        }

        let properties = device.properties();
        let attributes = device.attributes();
        self.properties
            .iter()
            .all(|(key, value)| properties.get(key) == Some(value))
            && self.tags.iter().all(|tag| device.has_tag(tag))
            && self
                .attributes
                .iter()
                .all(|(key, value)| attributes.get(key) == Some(value))
    }

    fn narrow(&self, query: &mut Query) {
        if let Some(subsystem) = &self.subsystem {
            query.match_subsystem(subsystem.as_str());
            if let Some(dev_type) = &self.dev_type {
                query.match_dev_type(dev_type.as_str());
            }
        }
    }
}

impl DeviceFilter for MatchCriteria {
    fn setup_enumerator(&self, query: &mut Query) {
        self.narrow(query);
    }

    fn setup_monitor(&self, query: &mut Query) {
        self.narrow(query);
    }

    fn is_visible(&self, device: &Description) -> bool {
        self.matches(device)
    }
}

/// Watcher that only reports devices matching its [`MatchCriteria`].
pub type FilteredDeviceWatcher = DeviceWatcher<MatchCriteria>;

impl DeviceWatcher<MatchCriteria> {
    /// Filtered watcher over a fresh udev context, with no criteria yet.
    pub fn filtered() -> Result<Self> {
        Ok(Self::with_database(Box::new(UdevDatabase::new()?), MatchCriteria::new()))
    }

    pub fn filtered_with_database(database: Box<dyn DeviceDatabase>, criteria: MatchCriteria) -> Self {
        Self::with_database(database, criteria)
    }

    pub fn set_subsystem(&mut self, subsystem: impl Into<String>) {
        self.filter_mut().set_subsystem(subsystem);
    }

    pub fn set_dev_type(&mut self, dev_type: impl Into<String>) {
        self.filter_mut().set_dev_type(dev_type);
    }

    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filter_mut().add_property(key, value);
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.filter_mut().add_tag(tag);
    }

    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filter_mut().add_attribute(key, value);
    }
}
