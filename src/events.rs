use crate::device::Description;
use crate::watcher::DeviceObserver;

/// A recorded device transition.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Added(Description),
    Removed(Description),
}

impl DeviceEvent {
    pub fn description(&self) -> &Description {
        match self {
            DeviceEvent::Added(device) | DeviceEvent::Removed(device) => device,
        }
    }

    pub fn dev_path(&self) -> &str {
        self.description().dev_path()
    }

    pub fn is_added(&self) -> bool {
        matches!(self, DeviceEvent::Added(_))
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, DeviceEvent::Removed(_))
    }
}

/// Collects transitions in delivery order.
impl DeviceObserver for Vec<DeviceEvent> {
    fn device_added(&mut self, device: &Description) {
        self.push(DeviceEvent::Added(device.clone()));
    }

    fn device_removed(&mut self, device: &Description) {
        self.push(DeviceEvent::Removed(device.clone()));
    }
}
