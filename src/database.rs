//! Seam between the watcher and the OS device database.
//!
//! The production implementation lives in [`crate::hotplug`] and talks to
//! libudev. Tests script their own database through the same traits.

use crate::device::NativeDevice;
use std::fmt;
use std::io;
use std::os::unix::io::AsRawFd;

/// Narrowing hints applied to an enumeration or a monitor subscription.
///
/// These only reduce what the database hands back. The filter's
/// `is_visible` still decides what a watcher reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub subsystem: Option<String>,
    pub dev_type: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_subsystem(&mut self, subsystem: impl Into<String>) -> &mut Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    /// Device type narrowing is only meaningful together with a subsystem.
    pub fn match_dev_type(&mut self, dev_type: impl Into<String>) -> &mut Self {
        self.dev_type = Some(dev_type.into());
        self
    }
}

/// Action carried by a monitor event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
    Change,
    /// bind, unbind, move, offline...
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::Add => "add",
            Action::Remove => "remove",
            Action::Change => "change",
            Action::Other(name) => name,
        }
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        match value {
            "add" => Action::Add,
            "remove" => Action::Remove,
            "change" => Action::Change,
            other => Action::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event read from a monitor, before it becomes a description.
pub struct RawEvent {
    pub action: Action,
    pub device: Box<dyn NativeDevice>,
}

impl fmt::Debug for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawEvent")
            .field("action", &self.action)
            .field("device", &self.device.dev_path())
            .finish()
    }
}

/// Connection to the device database.
pub trait DeviceDatabase {
    /// Walk every device currently present, narrowed by `query`.
    fn enumerate(&self, query: &Query) -> io::Result<Vec<Box<dyn NativeDevice>>>;

    /// Open a live event subscription, narrowed by `query`.
    fn monitor(&self, query: &Query) -> io::Result<Box<dyn DeviceMonitor>>;
}

/// Live event subscription. The descriptor becomes readable when an event
/// is pending.
pub trait DeviceMonitor: AsRawFd {
    /// Read at most one pending event without blocking.
    ///
    /// `None` means nothing is pending. `Some(Err(_))` is a single event that
    /// could not be read; later events are unaffected.
    fn receive(&mut self) -> Option<io::Result<RawEvent>>;
}
