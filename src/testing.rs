//! Scripted in-memory device database for unit tests.

use crate::database::{Action, DeviceDatabase, DeviceMonitor, Query, RawEvent};
use crate::device::{AttributeMap, Description, NativeDevice, PropertyMap, TagList};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub dev_path: String,
    pub subsystem: String,
    pub dev_type: Option<String>,
    pub parent: Option<String>,
    pub driver: Option<String>,
    pub dev_node: Option<String>,
    pub sys_num: Option<String>,
    pub seq_num: u64,
    pub initialized: bool,
    pub readable: bool,
    pub properties: PropertyMap,
    pub tags: TagList,
    pub attributes: AttributeMap,
}

impl FakeDevice {
    pub fn new(dev_path: &str, subsystem: &str) -> Self {
        Self {
            dev_path: dev_path.to_string(),
            subsystem: subsystem.to_string(),
            dev_type: None,
            parent: None,
            driver: None,
            dev_node: None,
            sys_num: None,
            seq_num: 0,
            initialized: true,
            readable: true,
            properties: PropertyMap::new(),
            tags: TagList::new(),
            attributes: AttributeMap::new(),
        }
    }

    pub fn dev_type(mut self, dev_type: &str) -> Self {
        self.dev_type = Some(dev_type.to_string());
        self
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn driver(mut self, driver: &str) -> Self {
        self.driver = Some(driver.to_string());
        self
    }

    pub fn dev_node(mut self, dev_node: &str) -> Self {
        self.dev_node = Some(dev_node.to_string());
        self
    }

    pub fn sys_num(mut self, sys_num: &str) -> Self {
        self.sys_num = Some(sys_num.to_string());
        self
    }

    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.readable = false;
        self
    }
}

enum Queued {
    Event(Action, Rc<FakeDevice>),
    Malformed,
}

#[derive(Default)]
struct State {
    devices: Vec<Rc<FakeDevice>>,
    queue: VecDeque<Queued>,
    monitor: Option<Query>,
    monitors_opened: usize,
    enumerations: usize,
    last_enumerate_query: Option<Query>,
    fail_enumerate: bool,
    fail_monitor: bool,
}

impl State {
    fn find(&self, dev_path: &str) -> Option<Rc<FakeDevice>> {
        self.devices.iter().find(|d| d.dev_path == dev_path).cloned()
    }
}

fn matches(query: &Query, device: &FakeDevice) -> bool {
    query.subsystem.as_deref().map_or(true, |s| s == device.subsystem)
        && query
            .dev_type
            .as_deref()
            .map_or(true, |t| device.dev_type.as_deref() == Some(t))
}

/// Device database whose contents and event stream are driven by the test.
#[derive(Clone, Default)]
pub struct FakeDatabase {
    state: Rc<RefCell<State>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, device: FakeDevice) {
        let mut state = self.state.borrow_mut();
        state.devices.retain(|d| d.dev_path != device.dev_path);
        state.devices.push(Rc::new(device));
    }

    /// Replace a device's data. Existing handles keep the old snapshot.
    pub fn update(&self, dev_path: &str, f: impl FnOnce(&mut FakeDevice)) {
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state.devices.iter_mut().find(|d| d.dev_path == dev_path) {
            let mut data = (**slot).clone();
            f(&mut data);
            *slot = Rc::new(data);
        }
    }

    /// Insert a device and deliver an `add` event to the open monitor.
    pub fn plug(&self, device: FakeDevice) {
        self.insert(device.clone());
        self.queue(Action::Add, device);
    }

    /// Remove a device and deliver a `remove` event to the open monitor.
    /// Like sysfs, the removed device no longer exposes attributes.
    pub fn unplug(&self, dev_path: &str) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let removed = state.find(dev_path);
            state.devices.retain(|d| d.dev_path != dev_path);
            removed
        };
        if let Some(device) = removed {
            let mut device = (*device).clone();
            device.attributes.clear();
            self.queue(Action::Remove, device);
        }
    }

    /// Deliver an event without touching the device list.
    pub fn queue(&self, action: Action, device: FakeDevice) {
        let mut state = self.state.borrow_mut();
        let Some(query) = state.monitor.as_ref() else {
            return;
        };
        if matches(query, &device) {
            state.queue.push_back(Queued::Event(action, Rc::new(device)));
        }
    }

    pub fn queue_malformed(&self) {
        let mut state = self.state.borrow_mut();
        if state.monitor.is_some() {
            state.queue.push_back(Queued::Malformed);
        }
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    pub fn monitor_open(&self) -> bool {
        self.state.borrow().monitor.is_some()
    }

    pub fn monitor_query(&self) -> Option<Query> {
        self.state.borrow().monitor.clone()
    }

    pub fn monitors_opened(&self) -> usize {
        self.state.borrow().monitors_opened
    }

    pub fn enumerations(&self) -> usize {
        self.state.borrow().enumerations
    }

    pub fn last_enumerate_query(&self) -> Option<Query> {
        self.state.borrow().last_enumerate_query.clone()
    }

    pub fn fail_enumerate(&self, fail: bool) {
        self.state.borrow_mut().fail_enumerate = fail;
    }

    pub fn fail_monitor(&self, fail: bool) {
        self.state.borrow_mut().fail_monitor = fail;
    }

    /// Handle for a device that is not part of the database.
    pub fn handle_for(&self, device: FakeDevice) -> Box<dyn NativeDevice> {
        Box::new(FakeHandle {
            data: Rc::new(device),
            state: Rc::clone(&self.state),
        })
    }

    pub fn handle(&self, dev_path: &str) -> Box<dyn NativeDevice> {
        let data = self
            .state
            .borrow()
            .find(dev_path)
            .unwrap_or_else(|| panic!("no fake device at {}", dev_path));
        Box::new(FakeHandle {
            data,
            state: Rc::clone(&self.state),
        })
    }

    pub fn describe(&self, dev_path: &str) -> Description {
        Description::new(self.handle(dev_path)).expect("valid fake device")
    }

    /// Handles currently referencing the stored data for `dev_path`.
    pub fn live_handles(&self, dev_path: &str) -> usize {
        self.state
            .borrow()
            .find(dev_path)
            .map_or(0, |d| Rc::strong_count(&d) - 2)
    }
}

impl DeviceDatabase for FakeDatabase {
    fn enumerate(&self, query: &Query) -> io::Result<Vec<Box<dyn NativeDevice>>> {
        let mut state = self.state.borrow_mut();
        state.enumerations += 1;
        state.last_enumerate_query = Some(query.clone());
        if state.fail_enumerate {
            return Err(io::Error::new(io::ErrorKind::Other, "enumerate failed"));
        }
        Ok(state
            .devices
            .iter()
            .filter(|d| matches(query, d))
            .map(|d| {
                Box::new(FakeHandle {
                    data: Rc::clone(d),
                    state: Rc::clone(&self.state),
                }) as Box<dyn NativeDevice>
            })
            .collect())
    }

    fn monitor(&self, query: &Query) -> io::Result<Box<dyn DeviceMonitor>> {
        let mut state = self.state.borrow_mut();
        if state.fail_monitor {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "netlink denied"));
        }
        state.monitors_opened += 1;
        state.monitor = Some(query.clone());
        Ok(Box::new(FakeMonitor {
            fd: 100 + state.monitors_opened as RawFd,
            state: Rc::clone(&self.state),
        }))
    }
}

struct FakeMonitor {
    fd: RawFd,
    state: Rc<RefCell<State>>,
}

impl AsRawFd for FakeMonitor {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl DeviceMonitor for FakeMonitor {
    fn receive(&mut self) -> Option<io::Result<RawEvent>> {
        let queued = self.state.borrow_mut().queue.pop_front()?;
        Some(match queued {
            Queued::Event(action, data) => Ok(RawEvent {
                action,
                device: Box::new(FakeHandle {
                    data,
                    state: Rc::clone(&self.state),
                }),
            }),
            Queued::Malformed => Err(io::Error::new(io::ErrorKind::InvalidData, "truncated uevent")),
        })
    }
}

impl Drop for FakeMonitor {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.monitor = None;
        state.queue.clear();
    }
}

#[derive(Debug)]
struct FakeHandle {
    data: Rc<FakeDevice>,
    state: Rc<RefCell<State>>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State").field("devices", &self.devices.len()).finish()
    }
}

impl FakeHandle {
    fn check(&self) -> io::Result<()> {
        if self.data.readable {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "sysfs read denied"))
        }
    }
}

impl NativeDevice for FakeHandle {
    fn dev_path(&self) -> Option<String> {
        Some(self.data.dev_path.clone())
    }

    fn subsystem(&self) -> Option<String> {
        Some(self.data.subsystem.clone())
    }

    fn dev_type(&self) -> Option<String> {
        self.data.dev_type.clone()
    }

    fn sys_path(&self) -> String {
        format!("/sys{}", self.data.dev_path)
    }

    fn sys_name(&self) -> String {
        self.data.dev_path.rsplit('/').next().unwrap_or_default().to_string()
    }

    fn sys_num(&self) -> Option<String> {
        self.data.sys_num.clone()
    }

    fn dev_node(&self) -> Option<String> {
        self.data.dev_node.clone()
    }

    fn driver(&self) -> Option<String> {
        self.data.driver.clone()
    }

    fn is_initialized(&self) -> bool {
        self.data.initialized
    }

    fn seq_num(&self) -> u64 {
        self.data.seq_num
    }

    fn usec_since_initialized(&self) -> u64 {
        0
    }

    fn properties(&self) -> io::Result<PropertyMap> {
        self.check()?;
        Ok(self.data.properties.clone())
    }

    fn tags(&self) -> io::Result<TagList> {
        self.check()?;
        Ok(self.data.tags.clone())
    }

    fn attributes(&self) -> io::Result<AttributeMap> {
        self.check()?;
        Ok(self.data.attributes.clone())
    }

    fn parent(&self) -> Option<Box<dyn NativeDevice>> {
        let parent = self.data.parent.as_deref()?;
        let data = self.state.borrow().find(parent)?;
        Some(Box::new(FakeHandle {
            data,
            state: Rc::clone(&self.state),
        }))
    }

    fn descendants(&self, subsystem: &str) -> io::Result<Vec<Box<dyn NativeDevice>>> {
        let prefix = format!("{}/", self.data.dev_path);
        let state = self.state.borrow();
        Ok(state
            .devices
            .iter()
            .filter(|d| d.dev_path.starts_with(&prefix) && d.subsystem == subsystem)
            .map(|d| {
                Box::new(FakeHandle {
                    data: Rc::clone(d),
                    state: Rc::clone(&self.state),
                }) as Box<dyn NativeDevice>
            })
            .collect())
    }

    fn duplicate(&self) -> Box<dyn NativeDevice> {
        Box::new(FakeHandle {
            data: Rc::clone(&self.data),
            state: Rc::clone(&self.state),
        })
    }
}
