//! Device database backed by libudev.
//!
//! Enumeration walks sysfs through a udev enumerator; hotplug events come
//! from a udev netlink monitor whose socket is non-blocking.

use crate::database::{Action, DeviceDatabase, DeviceMonitor, Query, RawEvent};
use crate::device::{AttributeMap, NativeDevice, PropertyMap, TagList};
use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use nix::errno::Errno;
use nix::time::{clock_gettime, ClockId};
use udev::{Device, Enumerator, MonitorBuilder, MonitorSocket, Udev};

/// Connection to the udev device database.
pub struct UdevDatabase {
    udev: Udev,
}

impl UdevDatabase {
    pub fn new() -> Result<Self> {
        let udev = Udev::new().map_err(|e| Error::connection("failed to open udev context", e))?;
        Ok(Self { udev })
    }

    /// Share a caller's udev context. The database holds its own reference.
    pub fn with_udev(udev: Udev) -> Self {
        Self { udev }
    }
}

impl DeviceDatabase for UdevDatabase {
    fn enumerate(&self, query: &Query) -> io::Result<Vec<Box<dyn NativeDevice>>> {
        let mut enumerator = Enumerator::with_udev(self.udev.clone())?;
        if let Some(subsystem) = &query.subsystem {
            enumerator.match_subsystem(subsystem)?;
        }
        // udev enumerators have no devtype match, DEVTYPE is a property
        if let Some(dev_type) = &query.dev_type {
            enumerator.match_property("DEVTYPE", dev_type)?;
        }

        Ok(enumerator
            .scan_devices()?
            .map(|device| Box::new(UdevDevice(device)) as Box<dyn NativeDevice>)
            .collect())
    }

    fn monitor(&self, query: &Query) -> io::Result<Box<dyn DeviceMonitor>> {
        let builder = MonitorBuilder::with_udev(self.udev.clone())?;
        let builder = match (&query.subsystem, &query.dev_type) {
            (Some(subsystem), Some(dev_type)) => builder.match_subsystem_devtype(subsystem, dev_type)?,
            (Some(subsystem), None) => builder.match_subsystem(subsystem)?,
            (None, _) => builder,
        };
        let socket = builder.listen()?;
        Ok(Box::new(UdevMonitor { socket }))
    }
}

struct UdevMonitor {
    socket: MonitorSocket,
}

impl AsRawFd for UdevMonitor {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl DeviceMonitor for UdevMonitor {
    fn receive(&mut self) -> Option<io::Result<RawEvent>> {
        Errno::clear();
        let Some(event) = self.socket.iter().next() else {
            // libudev returns NULL both when the socket is drained and when
            // it rejects a message; only errno tells them apart
            return receive_failure(Errno::last()).map(Err);
        };
        let device = event.device();
        let action = device
            .action()
            .map(|action| Action::from(&*action.to_string_lossy()))
            .unwrap_or_else(|| Action::Other("unknown".to_string()));
        Some(Ok(RawEvent {
            action,
            device: Box::new(UdevDevice(device)),
        }))
    }
}

/// Error behind an empty receive, or `None` if nothing was pending.
fn receive_failure(errno: Errno) -> Option<io::Error> {
    match errno {
        Errno::UnknownErrno | Errno::EAGAIN => None,
        errno => Some(io::Error::from(errno)),
    }
}

fn lossy(value: &OsStr) -> String {
    value.to_string_lossy().into_owned()
}

/// Native handle for one udev device. Cloning takes a new libudev reference.
#[derive(Clone)]
pub struct UdevDevice(Device);

impl UdevDevice {
    pub fn new(device: Device) -> Self {
        Self(device)
    }

    fn property_u64(&self, key: &str) -> Option<u64> {
        self.0.property_value(key)?.to_str()?.parse().ok()
    }
}

impl fmt::Debug for UdevDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UdevDevice").field(&self.0.syspath()).finish()
    }
}

/// Split a udev `TAGS` value (`:seat:uaccess:`) into distinct tags.
fn parse_tags(value: &str) -> TagList {
    let mut tags = TagList::new();
    for tag in value.split(':').filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn monotonic_usec() -> u64 {
    match clock_gettime(ClockId::CLOCK_MONOTONIC) {
        Ok(ts) => ts.tv_sec() as u64 * 1_000_000 + ts.tv_nsec() as u64 / 1_000,
        Err(_) => 0,
    }
}

impl NativeDevice for UdevDevice {
    fn dev_path(&self) -> Option<String> {
        Some(lossy(self.0.devpath()))
    }

    fn subsystem(&self) -> Option<String> {
        self.0.subsystem().map(lossy)
    }

    fn dev_type(&self) -> Option<String> {
        self.0.devtype().map(lossy)
    }

    fn sys_path(&self) -> String {
        self.0.syspath().to_string_lossy().into_owned()
    }

    fn sys_name(&self) -> String {
        lossy(self.0.sysname())
    }

    fn sys_num(&self) -> Option<String> {
        self.0.sysnum().map(|n| n.to_string())
    }

    fn dev_node(&self) -> Option<String> {
        self.0.devnode().map(|p| p.to_string_lossy().into_owned())
    }

    fn driver(&self) -> Option<String> {
        self.0.driver().map(lossy)
    }

    fn is_initialized(&self) -> bool {
        self.0.is_initialized()
    }

    fn seq_num(&self) -> u64 {
        self.property_u64("SEQNUM").unwrap_or(0)
    }

    fn usec_since_initialized(&self) -> u64 {
        match self.property_u64("USEC_INITIALIZED") {
            Some(initialized) if initialized > 0 => monotonic_usec().saturating_sub(initialized),
            _ => 0,
        }
    }

    fn properties(&self) -> io::Result<PropertyMap> {
        let mut properties = PropertyMap::new();
        for entry in self.0.properties() {
            let name = entry.name();
            if let Some(value) = self.0.property_value(name) {
                properties.insert(lossy(name), lossy(value));
            }
        }
        Ok(properties)
    }

    fn tags(&self) -> io::Result<TagList> {
        Ok(self
            .0
            .property_value("TAGS")
            .map(|tags| parse_tags(&tags.to_string_lossy()))
            .unwrap_or_default())
    }

    /// Attributes that cannot be read (write-only, binary) are left out.
    fn attributes(&self) -> io::Result<AttributeMap> {
        let mut attributes = AttributeMap::new();
        for entry in self.0.attributes() {
            let name = entry.name();
            if let Some(value) = self.0.attribute_value(name) {
                attributes.insert(lossy(name), value.to_string_lossy().trim_end().to_string());
            }
        }
        Ok(attributes)
    }

    fn parent(&self) -> Option<Box<dyn NativeDevice>> {
        self.0
            .parent()
            .map(|parent| Box::new(UdevDevice(parent)) as Box<dyn NativeDevice>)
    }

    fn descendants(&self, subsystem: &str) -> io::Result<Vec<Box<dyn NativeDevice>>> {
        let mut enumerator = Enumerator::new()?;
        enumerator.match_parent(&self.0)?;
        enumerator.match_subsystem(subsystem)?;

        // match_parent includes the parent itself
        let own_path = self.0.syspath().to_path_buf();
        Ok(enumerator
            .scan_devices()?
            .filter(|device| device.syspath() != own_path.as_path())
            .map(|device| Box::new(UdevDevice(device)) as Box<dyn NativeDevice>)
            .collect())
    }

    fn duplicate(&self) -> Box<dyn NativeDevice> {
        Box::new(self.clone())
    }
}
