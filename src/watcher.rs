//! Device watcher: reconciles an enumeration snapshot with the live event
//! stream and reports devices as they come and go.
//!
//! The watcher does no threading and never blocks. The host registers
//! [`DeviceWatcher::monitor_fd`] with its event loop and calls
//! [`DeviceWatcher::process_pending`] whenever that descriptor is readable.

use crate::database::{Action, DeviceDatabase, DeviceMonitor, Query, RawEvent};
use crate::device::Description;
use crate::error::{Error, Result};
use crate::hotplug::UdevDatabase;
use std::collections::HashMap;
use std::os::unix::io::RawFd;
use tracing::{debug, info, trace, warn};

/// Receives device transitions, synchronously and one call per transition.
///
/// Observers are borrowed for the duration of a watcher call, so they
/// cannot re-enter the watcher while a notification is being delivered.
pub trait DeviceObserver {
    fn device_added(&mut self, device: &Description);
    fn device_removed(&mut self, device: &Description);
}

/// Decides which devices a watcher reports.
pub trait DeviceFilter {
    /// Narrow what `scan` enumerates.
    fn setup_enumerator(&self, _query: &mut Query) {}

    /// Narrow what the monitor subscribes to. Applied once per activation.
    fn setup_monitor(&self, _query: &mut Query) {}

    /// Final say on both enumerated and event-sourced devices.
    fn is_visible(&self, _device: &Description) -> bool {
        true
    }
}

/// Filter that lets every device through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl DeviceFilter for AcceptAll {}

type DeviceMap = HashMap<String, Description>;

pub struct DeviceWatcher<F: DeviceFilter = AcceptAll> {
    database: Box<dyn DeviceDatabase>,
    filter: F,
    monitor: Option<Box<dyn DeviceMonitor>>,
    active: bool,
    known: DeviceMap,
}

impl DeviceWatcher<AcceptAll> {
    /// Watcher over a fresh udev context, reporting every device.
    pub fn new() -> Result<Self> {
        Ok(Self::with_database(Box::new(UdevDatabase::new()?), AcceptAll))
    }
}

impl<F: DeviceFilter> DeviceWatcher<F> {
    /// Watcher over any device database. Starts inactive with nothing known.
    pub fn with_database(database: Box<dyn DeviceDatabase>, filter: F) -> Self {
        Self {
            database,
            filter,
            monitor: None,
            active: false,
            known: DeviceMap::new(),
        }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Changes take effect at the next `scan` (enumeration) and the next
    /// activation (monitor subscription).
    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Devices currently considered present, keyed by device path.
    pub fn known_devices(&self) -> &HashMap<String, Description> {
        &self.known
    }

    pub fn is_known(&self, dev_path: &str) -> bool {
        self.known.contains_key(dev_path)
    }

    /// Descriptor to watch for readability while active.
    pub fn monitor_fd(&self) -> Option<RawFd> {
        self.monitor.as_ref().map(|monitor| monitor.as_raw_fd())
    }

    /// Start or stop listening for events.
    ///
    /// Activation opens the monitor before scanning, so devices plugged
    /// during the scan are still delivered as events. Deactivation drops
    /// the monitor and leaves the known set as it was.
    pub fn set_active(&mut self, active: bool, observer: &mut dyn DeviceObserver) -> Result<()> {
        if active == self.active {
            return Ok(());
        }

        if active {
            let mut query = Query::new();
            self.filter.setup_monitor(&mut query);
            let monitor = self
                .database
                .monitor(&query)
                .map_err(|e| Error::connection("failed to open device monitor", e))?;
            debug!("Device monitor listening on fd {}", monitor.as_raw_fd());

            self.monitor = Some(monitor);
            self.active = true;
            if let Err(e) = self.scan(observer) {
                self.monitor = None;
                self.active = false;
                return Err(e);
            }
            info!("Device watcher active, {} device(s) known", self.known.len());
        } else {
            self.monitor = None;
            self.active = false;
            info!("Device watcher paused");
        }
        Ok(())
    }

    /// Enumerate present devices and reconcile them against the known set.
    ///
    /// Removals are reported before additions. Devices seen both before and
    /// now produce no notification.
    pub fn scan(&mut self, observer: &mut dyn DeviceObserver) -> Result<()> {
        let mut query = Query::new();
        self.filter.setup_enumerator(&mut query);
        let devices = self
            .database
            .enumerate(&query)
            .map_err(|e| Error::connection("failed to enumerate devices", e))?;

        let mut candidates = DeviceMap::new();
        for device in devices {
            match Description::new(device) {
                Ok(description) if self.filter.is_visible(&description) => {
                    candidates.insert(description.dev_path().to_string(), description);
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping device during scan: {}", e),
            }
        }

        let gone: Vec<String> = self
            .known
            .keys()
            .filter(|path| !candidates.contains_key(*path))
            .cloned()
            .collect();
        for path in gone {
            if let Some(description) = self.known.remove(&path) {
                debug!("Device removed: {}", path);
                observer.device_removed(&description);
            }
        }

        for (path, description) in candidates {
            if self.known.contains_key(&path) {
                continue;
            }
            debug!("Device added: {}", path);
            observer.device_added(&description);
            self.known.insert(path, description);
        }
        Ok(())
    }

    /// Read and handle exactly one pending monitor event.
    ///
    /// Returns `false` when inactive or when nothing was pending. Events
    /// that cannot be read or described are logged and dropped.
    pub fn process_pending(&mut self, observer: &mut dyn DeviceObserver) -> bool {
        let Some(monitor) = self.monitor.as_mut() else {
            return false;
        };

        let event = match monitor.receive() {
            None => return false,
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!("Dropping unreadable device event: {}", e);
                return true;
            }
        };
        self.handle_event(event, observer);
        true
    }

    fn handle_event(&mut self, event: RawEvent, observer: &mut dyn DeviceObserver) {
        let RawEvent { action, device } = event;
        let description = match Description::new(device) {
            Ok(description) => description,
            Err(e) => {
                warn!("Dropping {} event: {}", action, e);
                return;
            }
        };
        let path = description.dev_path().to_string();

        match action {
            Action::Add => {
                if !self.filter.is_visible(&description) {
                    trace!("Ignoring add of filtered device {}", path);
                    return;
                }
                if self.known.contains_key(&path) {
                    trace!("Ignoring add of known device {}", path);
                    return;
                }
                debug!("Device added: {}", path);
                observer.device_added(&description);
                self.known.insert(path, description);
            }
            // sysfs is already gone for a removed device, so match on the
            // path and report the snapshot taken while it was present.
            Action::Remove => {
                if let Some(known) = self.known.remove(&path) {
                    debug!("Device removed: {}", path);
                    observer.device_removed(&known);
                }
            }
            other => trace!("Ignoring {} event for {}", other, path),
        }
    }
}
