//! Provisioning state: per-resource request status plus the known devices.

use std::collections::BTreeMap;

use devicehub_common::{ComponentKind, ComponentRecord, Device, Link};

use super::Lifecycle;

/// Request status and last result for one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSlot<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub result: Option<T>,
}

impl<T> Default for ResourceSlot<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            result: None,
        }
    }
}

impl<T> ResourceSlot<T> {
    fn apply(&mut self, phase: Lifecycle<T>) {
        match phase {
            Lifecycle::Pending => {
                self.loading = true;
                self.error = None;
            }
            Lifecycle::Fulfilled(result) => {
                self.loading = false;
                self.result = Some(result);
            }
            Lifecycle::Rejected(error) => {
                self.loading = false;
                self.error = Some(error);
            }
        }
    }

    fn clear_status(&mut self) {
        self.loading = false;
        self.error = None;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeSlice {
    /// Set while a provisioning run is in flight.
    pub provisioning: bool,
    pub device: ResourceSlot<Device>,
    pub components: BTreeMap<ComponentKind, ResourceSlot<ComponentRecord>>,
    pub links: BTreeMap<ComponentKind, ResourceSlot<Link>>,
    /// Device created by the latest run.
    pub current_device: Option<Device>,
    /// Every device created from this machine, persisted across restarts.
    pub devices: Vec<Device>,
}

impl HomeSlice {
    pub(super) fn apply_device(&mut self, phase: Lifecycle<Device>) {
        if let Lifecycle::Fulfilled(ref device) = phase {
            self.current_device = Some(device.clone());
            self.devices.push(device.clone());
        }
        self.device.apply(phase);
    }

    pub(super) fn apply_component(&mut self, kind: ComponentKind, phase: Lifecycle<ComponentRecord>) {
        self.components.entry(kind).or_default().apply(phase);
    }

    pub(super) fn apply_link(&mut self, kind: ComponentKind, phase: Lifecycle<Link>) {
        self.links.entry(kind).or_default().apply(phase);
    }

    pub(super) fn clear_status(&mut self) {
        self.device.clear_status();
        self.components.values_mut().for_each(ResourceSlot::clear_status);
        self.links.values_mut().for_each(ResourceSlot::clear_status);
    }

    /// Whether a device owned by `owner_id` was already created from this machine.
    #[must_use]
    pub fn has_device_for(&self, owner_id: i64) -> bool {
        self.devices.iter().any(|device| device.owner_id == owner_id)
    }

    #[must_use]
    pub fn component(&self, kind: ComponentKind) -> Option<&ResourceSlot<ComponentRecord>> {
        self.components.get(&kind)
    }

    #[must_use]
    pub fn link(&self, kind: ComponentKind) -> Option<&ResourceSlot<Link>> {
        self.links.get(&kind)
    }
}
